pub use bbox::{CyCxHW, RectFloat as _, RectNum as _, Transform, HW};
pub use getset::{CopyGetters, Getters};
pub use itertools::izip;
pub use label::ImageLabels;
pub use log::debug;
pub use ndarray::{Array1, Array2, Array3, ArrayView1};
pub use noisy_float::prelude::*;
pub use rand::prelude::*;
pub use rayon::prelude::*;
pub use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
pub use std::{
    fmt::{self, Display, Formatter},
    iter,
    num::NonZeroUsize,
    path::Path,
};
