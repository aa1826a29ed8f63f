pub mod port_scan_preparation;

pub use port_scan_preparation::SkipCdn;
