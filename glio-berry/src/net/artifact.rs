//! 模型文件: 网络结构与权重保存在同一个文件中.
//!
//! 文件内容为 zlib 压缩的 bincode 信封, 依次包含魔数, 格式版本, [`SegNetConfig`]
//! 以及 burn 以全精度编码的权重记录.

use super::model::{SegNet, SegNetConfig};
use crate::error::{PipelineError, PipelineResult};
use burn::module::Module;
use burn::record::{BinBytesRecorder, FullPrecisionSettings, Recorder};
use burn::tensor::backend::Backend;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

const MAGIC: [u8; 8] = *b"GLIOSEG\0";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Envelope {
    magic: [u8; 8],
    version: u32,
    config: SegNetConfig,
    weights: Vec<u8>,
}

/// 保存模型. `path` 处已有的文件会被直接覆盖.
pub fn save_artifact<B: Backend, P: AsRef<Path>>(
    model: &SegNet<B>,
    config: &SegNetConfig,
    path: P,
) -> PipelineResult<()> {
    let path = path.as_ref();
    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    let weights: Vec<u8> = Recorder::<B>::record(&recorder, model.clone().into_record(), ())
        .map_err(|e| PipelineError::artifact(path, e))?;
    let envelope = Envelope {
        magic: MAGIC,
        version: FORMAT_VERSION,
        config: config.clone(),
        weights,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    if path.exists() {
        log::info!("overwriting model artifact `{}`", path.display());
    }
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    let mut e = ZlibEncoder::new(BufWriter::new(file), Compression::default());
    bincode::serialize_into(&mut e, &envelope).map_err(|err| PipelineError::artifact(path, err))?;
    let mut inner = e.finish().map_err(|err| PipelineError::io(path, err))?;
    inner.flush().map_err(|err| PipelineError::io(path, err))?;
    log::info!("model artifact saved to `{}`", path.display());
    Ok(())
}

/// 读取模型: 按文件中保存的结构重建网络, 再载入权重.
///
/// # 返回值
///
/// 文件不存在时返回 [`PipelineError::Io`]; 文件损坏, 魔数或版本不符, 权重与结构不匹配时返回
/// [`PipelineError::Artifact`].
pub fn load_artifact<B: Backend, P: AsRef<Path>>(
    path: P,
    device: &B::Device,
) -> PipelineResult<(SegNet<B>, SegNetConfig)> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let envelope: Envelope = bincode::deserialize_from(ZlibDecoder::new(BufReader::new(file)))
        .map_err(|e| PipelineError::artifact(path, e))?;
    if envelope.magic != MAGIC {
        return Err(PipelineError::artifact(path, "not a segmentation model file"));
    }
    if envelope.version != FORMAT_VERSION {
        return Err(PipelineError::artifact(
            path,
            format!("unsupported format version {}", envelope.version),
        ));
    }

    let recorder = BinBytesRecorder::<FullPrecisionSettings>::default();
    let record: <SegNet<B> as Module<B>>::Record =
        Recorder::<B>::load(&recorder, envelope.weights, device)
            .map_err(|e| PipelineError::artifact(path, e))?;
    let model = envelope.config.init::<B>(device).load_record(record);
    Ok((model, envelope.config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::{Distribution, Tensor};

    fn tiny() -> SegNetConfig {
        SegNetConfig {
            in_channels: 1,
            num_classes: 1,
            base_filters: 2,
            dropout: 0.5,
            height: 17,
            width: 16,
        }
    }

    #[test]
    fn test_save_load_same_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.glio");
        let device = Default::default();
        let config = tiny();
        let net = config.init::<NdArray>(&device);
        save_artifact(&net, &config, &path).unwrap();
        // 覆盖写.
        save_artifact(&net, &config, &path).unwrap();

        let (back, back_config) = load_artifact::<NdArray, _>(&path, &device).unwrap();
        assert_eq!(back_config, config);

        let x = Tensor::<NdArray, 4>::random([1, 1, 17, 16], Distribution::Default, &device);
        let a = net.forward(x.clone()).into_data().convert::<f32>().to_vec::<f32>().unwrap();
        let b = back.forward(x).into_data().convert::<f32>().to_vec::<f32>().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.glio");
        let device = Default::default();
        assert!(matches!(
            load_artifact::<NdArray, _>(&path, &device),
            Err(PipelineError::Io { .. })
        ));
        std::fs::write(&path, b"\x00\x01garbage").unwrap();
        assert!(matches!(
            load_artifact::<NdArray, _>(&path, &device),
            Err(PipelineError::Artifact { .. })
        ));
    }
}
