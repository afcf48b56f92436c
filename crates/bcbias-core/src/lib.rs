//! Bias correction of GEOS-Chem boundary-condition files.
//!
//! A scaled `[date, lat, lon]` bias table is matched to boundary-condition
//! files by the date key embedded in their names, and the matching correction
//! is subtracted from every vertical level of the species field.

pub mod common;
pub mod domain;
pub mod modules;
pub mod storage;
