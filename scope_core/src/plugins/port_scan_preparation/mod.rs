//! Plugins run before port scanning to decide how, or whether, a target is
//! scanned.

mod cidr;
mod skip_cdn;

pub use cidr::CidrRange;
pub use skip_cdn::SkipCdn;

/// Module name shared by every plugin in this stage
pub const MODULE: &str = "PortScanPreparation";

pub const SKIP_CDN: &str = skip_cdn::NAME;
