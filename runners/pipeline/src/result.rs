//! 运行结果.

use glio_berry::net::TrainingReport;
use glio_berry::prep::BatchReport;
use glio_berry::workflow::VolumeReport;
use glio_berry::PipelineConfig;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// 各子命令的产出.
#[derive(Debug)]
pub enum Outcome {
    /// 目录批处理.
    Files(BatchReport),
    /// 训练与测试评估.
    Training(TrainingReport),
    /// 预测对比图.
    Figures(Vec<PathBuf>),
    /// 三维重建.
    Volume(VolumeReport),
    /// 生效的配置.
    Config(Box<PipelineConfig>),
}

/// 将 `outcome` 的结果写进 `w` 中.
fn describe_into<W: Write>(name: &str, outcome: &Outcome, elapsed: Duration, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Command `{name}`:")?;
    match outcome {
        Outcome::Files(r) => {
            writeln!(w, "{S4}Written: {}", r.written.len())?;
            writeln!(w, "{S4}Skipped: {}", r.skipped.len())?;
            for p in &r.skipped {
                writeln!(w, "{S4}{S4}{}", p.display())?;
            }
        }
        Outcome::Training(r) => {
            for s in &r.history {
                write!(
                    w,
                    "{S4}Epoch {}: loss {:.4}, accuracy {:.4}",
                    s.epoch, s.train.loss, s.train.accuracy
                )?;
                match s.validation {
                    Some(v) => writeln!(w, ", val_loss {:.4}, val_accuracy {:.4}", v.loss, v.accuracy)?,
                    None => writeln!(w)?,
                }
            }
            writeln!(w, "{S4}Test loss: {:.4}", r.test.loss)?;
            writeln!(w, "{S4}Test accuracy: {:.4}", r.test.accuracy)?;
            writeln!(w, "{S4}Model: {}", r.artifact.display())?;
        }
        Outcome::Figures(paths) => {
            writeln!(w, "{S4}Figures: {}", paths.len())?;
            if let Some(p) = paths.last() {
                writeln!(w, "{S4}Last: {}", p.display())?;
            }
        }
        Outcome::Volume(r) => {
            writeln!(w, "{S4}Volume shape: {:?}", r.shape)?;
            if r.mesh.is_empty() {
                writeln!(w, "{S4}Surface: empty (placeholder page written)")?;
            } else {
                writeln!(
                    w,
                    "{S4}Surface: {} vertices, {} faces",
                    r.mesh.vertex_count(),
                    r.mesh.face_count()
                )?;
            }
            writeln!(w, "{S4}Page: {}", r.page.display())?;
        }
        Outcome::Config(c) => {
            let text = serde_json::to_string_pretty(c).map_err(io::Error::other)?;
            writeln!(w, "{text}")?;
        }
    }
    write!(w, "{S4}Elapsed: {:.3} s", elapsed.as_secs_f64())
}

/// 一次子命令运行的最终结果.
pub struct RunResult {
    name: &'static str,
    outcome: Outcome,
    elapsed: Duration,
}

impl RunResult {
    pub fn new(name: &'static str, outcome: Outcome, elapsed: Duration) -> Self {
        Self {
            name,
            outcome,
            elapsed,
        }
    }

    /// 打印运行结果.
    pub fn analyze(&self) {
        utils::sep();
        let mut buf = Vec::with_capacity(512);
        match describe_into(self.name, &self.outcome, self.elapsed, &mut buf) {
            Ok(()) => println!("{}", String::from_utf8_lossy(&buf)),
            Err(e) => eprintln!("cannot describe result: {e}"),
        }
        utils::sep();
    }
}
