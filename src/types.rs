use std::sync::{Arc, RwLock};

use crate::error::SmallError;

pub type Pod<T> = Arc<RwLock<T>>;
pub type ResultPod<T> = Result<Pod<T>, SmallError>;
pub type SmallResult = Result<(), SmallError>;
