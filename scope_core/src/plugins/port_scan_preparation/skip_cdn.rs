use async_trait::async_trait;
use tracing::info;

use super::cidr::CidrRange;
use super::MODULE;
use crate::params::{parse_args, split_list, ParseError};
use crate::plugin_manager::Result;
use crate::types::{ModuleOutput, Plugin, PluginCore, PreparationVerdict, Target};

pub const NAME: &str = "SkipCdn";

const SUFFIXES: &str = "suffixes";
const RANGES: &str = "ranges";

/// CNAME targets of well-known CDN providers
const DEFAULT_SUFFIXES: &[&str] = &[
    "cloudflare.net",
    "cloudfront.net",
    "akamai.net",
    "akamaiedge.net",
    "akamaized.net",
    "edgekey.net",
    "edgesuite.net",
    "fastly.net",
    "fastlylb.net",
    "azureedge.net",
    "azurefd.net",
    "b-cdn.net",
    "cdn77.org",
    "gcdn.co",
    "incapdns.net",
    "impervadns.net",
    "llnwd.net",
    "stackpathdns.com",
    "alikunlun.com",
    "kunlunar.com",
    "cdn.dnsv1.com",
    "wscdns.com",
    "chinacache.net",
];

/// Published Cloudflare and Fastly edge ranges
const DEFAULT_RANGES: &[&str] = &[
    "173.245.48.0/20",
    "103.21.244.0/22",
    "103.22.200.0/22",
    "103.31.4.0/22",
    "141.101.64.0/18",
    "108.162.192.0/18",
    "190.93.240.0/20",
    "188.114.96.0/20",
    "197.234.240.0/22",
    "198.41.128.0/17",
    "162.158.0.0/15",
    "104.16.0.0/13",
    "104.24.0.0/14",
    "172.64.0.0/13",
    "131.0.72.0/22",
    "151.101.0.0/16",
    "2400:cb00::/32",
    "2606:4700::/32",
    "2803:f800::/32",
    "2405:b500::/32",
    "2405:8100::/32",
    "2a06:98c0::/29",
    "2c0f:f248::/32",
];

/// Decides whether a target sits behind a CDN, in which case port scanning
/// it would only probe the provider's edge.
///
/// Options (both extend the built-in lists, values comma separated):
///
/// * `-suffixes a.net,b.com` - extra CNAME / host suffixes
/// * `-ranges 192.0.2.0/24,2001:db8::/32` - extra address ranges
#[derive(Debug)]
pub struct SkipCdn {
    core: PluginCore,
}

impl SkipCdn {
    pub fn new() -> Self {
        Self {
            core: PluginCore::new(NAME, MODULE),
        }
    }
}

impl Default for SkipCdn {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Plugin for SkipCdn {
    fn core(&self) -> &PluginCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut PluginCore {
        &mut self.core
    }

    fn validate(&self) -> Result<()> {
        CdnRules::from_parameter(self.parameter())?;
        Ok(())
    }

    async fn execute(&mut self, target: &Target) -> Result<Option<ModuleOutput>> {
        let rules = CdnRules::from_parameter(self.parameter())?;
        let verdict = rules.evaluate(target);

        info!(
            host = %target,
            skip = verdict.skip_port_scan,
            reason = ?verdict.reason,
            "CDN check finished"
        );

        let output = ModuleOutput::PortScanPreparation(verdict);
        self.core.emit(target, output.clone())?;
        Ok(Some(output))
    }

    fn clone_plugin(&self) -> Box<dyn Plugin> {
        Box::new(Self {
            core: self.core.fresh_clone(),
        })
    }
}

#[derive(Debug)]
struct CdnRules {
    suffixes: Vec<String>,
    ranges: Vec<CidrRange>,
}

impl CdnRules {
    fn from_parameter(parameter: &str) -> std::result::Result<Self, ParseError> {
        let options = parse_args(parameter, &[SUFFIXES, RANGES])?;

        let suffixes = DEFAULT_SUFFIXES
            .iter()
            .map(|s| s.to_string())
            .chain(split_list(&options[SUFFIXES]))
            .map(|s| normalize(&s))
            .collect();

        let ranges = DEFAULT_RANGES
            .iter()
            .map(|s| s.to_string())
            .chain(split_list(&options[RANGES]))
            .map(|range| {
                range.parse::<CidrRange>().map_err(|_| ParseError::InvalidValue {
                    option: RANGES.to_string(),
                    value: range,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { suffixes, ranges })
    }

    fn evaluate(&self, target: &Target) -> PreparationVerdict {
        for cname in &target.cnames {
            if let Some(suffix) = self.matching_suffix(cname) {
                return PreparationVerdict::skip(
                    &target.host,
                    format!("cname {} matches CDN suffix {}", cname, suffix),
                );
            }
        }

        if let Some(suffix) = self.matching_suffix(&target.host) {
            return PreparationVerdict::skip(
                &target.host,
                format!("host matches CDN suffix {}", suffix),
            );
        }

        for addr in &target.addresses {
            if let Some(range) = self.ranges.iter().find(|r| r.contains(addr)) {
                return PreparationVerdict::skip(
                    &target.host,
                    format!("address {} is in CDN range {}", addr, range),
                );
            }
        }

        PreparationVerdict::proceed(&target.host)
    }

    fn matching_suffix(&self, name: &str) -> Option<&str> {
        let name = normalize(name);
        self.suffixes
            .iter()
            .find(|suffix| {
                name == **suffix
                    || name
                        .strip_suffix(suffix.as_str())
                        .is_some_and(|rest| rest.ends_with('.'))
            })
            .map(String::as_str)
    }
}

fn normalize(name: &str) -> String {
    name.trim().trim_matches('.').to_ascii_lowercase()
}
