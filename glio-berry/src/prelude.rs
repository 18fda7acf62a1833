//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::config::{ChannelMode, DecodePolicy, ExhaustionPolicy, PipelineConfig};
pub use crate::error::{PipelineError, PipelineResult};

pub use crate::data::{Rescale, Volume};

pub use crate::consts::gray::{MASK_BACKGROUND, MASK_FOREGROUND};
pub use crate::consts::{ISO_LEVEL, TARGET_HEIGHT, TARGET_WIDTH, VOLUME_SLICES};

pub use crate::dataset::{
    self, home_dataset_dir_with, BatchSource, CancelToken, DataLayout, Manifest, PairedFeeder,
    Split,
};
pub use crate::net::{Predictor, SegNet, SegNetConfig};
pub use crate::post_proc::remove_blur;
pub use crate::surface::{marching_cubes, IsoMesh};
