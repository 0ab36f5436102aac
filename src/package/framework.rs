//! Target framework monikers and compatibility
//!
//! Understands short folder names (`net45`, `netstandard2.0`, `net8.0`) and the
//! long forms used in nuspec dependency groups (`.NETFramework4.5`).

use serde::{Serialize, Serializer};
use std::fmt;

/// Framework family
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FrameworkFamily {
    /// Framework-agnostic content
    Any,
    /// .NET Framework (`net45`, `net472`)
    NetFramework,
    /// .NET Standard
    NetStandard,
    /// .NET Core App up to 3.1
    NetCoreApp,
    /// .NET 5 and later
    Net,
    /// Anything else, keyed by lowercased name
    Other(String),
}

/// A parsed target framework
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetFramework {
    pub family: FrameworkFamily,
    pub version: (u32, u32, u32),
}

impl TargetFramework {
    /// The framework-agnostic moniker
    pub fn any() -> Self {
        Self {
            family: FrameworkFamily::Any,
            version: (0, 0, 0),
        }
    }

    /// Parse a short or long framework moniker. Returns `None` for empty input.
    pub fn parse(input: &str) -> Option<Self> {
        let lowered = input.trim().to_ascii_lowercase();
        if lowered.is_empty() {
            return None;
        }
        // Drop platform suffixes: net6.0-windows -> net6.0
        let name = match lowered.split_once('-') {
            Some((head, _)) if !head.is_empty() => head,
            _ => lowered.as_str(),
        };

        if name == "any" || name == "agnostic" {
            return Some(Self::any());
        }

        let long_forms = [
            (".netframework", FrameworkFamily::NetFramework),
            (".netstandard", FrameworkFamily::NetStandard),
            (".netcoreapp", FrameworkFamily::NetCoreApp),
            ("netstandard", FrameworkFamily::NetStandard),
            ("netcoreapp", FrameworkFamily::NetCoreApp),
        ];
        for (prefix, family) in long_forms {
            if let Some(rest) = name.strip_prefix(prefix) {
                let rest = rest.trim_start_matches(",version=v").trim_start_matches('v');
                let version = parse_dotted(rest)?;
                // .NETCoreApp5.0+ is the unified platform
                let family = if family == FrameworkFamily::NetCoreApp && version.0 >= 5 {
                    FrameworkFamily::Net
                } else {
                    family
                };
                return Some(Self { family, version });
            }
        }

        if let Some(rest) = name.strip_prefix("net") {
            if rest.contains('.') {
                let version = parse_dotted(rest)?;
                let family = if version.0 >= 5 {
                    FrameworkFamily::Net
                } else {
                    FrameworkFamily::NetFramework
                };
                return Some(Self { family, version });
            }
            if !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()) {
                // net452 -> 4.5.2
                let digits: Vec<u32> = rest.chars().filter_map(|c| c.to_digit(10)).collect();
                let at = |i: usize| digits.get(i).copied().unwrap_or(0);
                return Some(Self {
                    family: FrameworkFamily::NetFramework,
                    version: (at(0), at(1), at(2)),
                });
            }
        }

        let split = name
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(name.len());
        let (family_name, rest) = name.split_at(split);
        Some(Self {
            family: FrameworkFamily::Other(family_name.to_string()),
            version: parse_dotted(rest).unwrap_or((0, 0, 0)),
        })
    }

    /// Whether a package built for `self` can be consumed by `requested`
    pub fn is_compatible_with(&self, requested: &TargetFramework) -> bool {
        use FrameworkFamily::*;

        match (&self.family, &requested.family) {
            (Any, _) => true,
            (NetStandard, NetFramework | NetCoreApp | Net) => {
                self.standard_implemented_by(requested)
            }
            (NetCoreApp, Net) => true,
            (a, b) if a == b => self.version <= requested.version,
            _ => false,
        }
    }

    /// Whether a platform framework implements this .NET Standard version
    fn standard_implemented_by(&self, platform: &TargetFramework) -> bool {
        let (major, minor, _) = self.version;
        let Some(support) = STANDARD_SUPPORT
            .iter()
            .find(|support| support.standard == (major, minor))
        else {
            return false;
        };

        match platform.family {
            FrameworkFamily::NetFramework => support
                .framework
                .is_some_and(|floor| floor <= platform.version),
            FrameworkFamily::NetCoreApp => support.core_app <= platform.version,
            FrameworkFamily::Net => true,
            _ => false,
        }
    }

    /// Short folder name, e.g. `net472` or `netstandard2.0`
    pub fn short_name(&self) -> String {
        let (major, minor, patch) = self.version;
        let dotted = if patch != 0 {
            format!("{}.{}.{}", major, minor, patch)
        } else {
            format!("{}.{}", major, minor)
        };

        match &self.family {
            FrameworkFamily::Any => "any".to_string(),
            FrameworkFamily::NetFramework => {
                let mut name = format!("net{}{}", major, minor);
                if patch != 0 {
                    name.push_str(&patch.to_string());
                }
                name
            }
            FrameworkFamily::NetStandard => format!("netstandard{}", dotted),
            FrameworkFamily::NetCoreApp => format!("netcoreapp{}", dotted),
            FrameworkFamily::Net => format!("net{}", dotted),
            FrameworkFamily::Other(name) if self.version == (0, 0, 0) => name.clone(),
            FrameworkFamily::Other(name) => format!("{}{}", name, dotted),
        }
    }
}

impl fmt::Display for TargetFramework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.short_name())
    }
}

impl Serialize for TargetFramework {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Oldest platform releases implementing a .NET Standard version
struct StandardSupport {
    standard: (u32, u32),
    /// `None` where no .NET Framework release implements it
    framework: Option<(u32, u32, u32)>,
    core_app: (u32, u32, u32),
}

const STANDARD_SUPPORT: &[StandardSupport] = &[
    StandardSupport { standard: (1, 0), framework: Some((4, 5, 0)), core_app: (1, 0, 0) },
    StandardSupport { standard: (1, 1), framework: Some((4, 5, 0)), core_app: (1, 0, 0) },
    StandardSupport { standard: (1, 2), framework: Some((4, 5, 1)), core_app: (1, 0, 0) },
    StandardSupport { standard: (1, 3), framework: Some((4, 6, 0)), core_app: (1, 0, 0) },
    StandardSupport { standard: (1, 4), framework: Some((4, 6, 1)), core_app: (1, 0, 0) },
    StandardSupport { standard: (1, 5), framework: Some((4, 6, 1)), core_app: (1, 0, 0) },
    StandardSupport { standard: (1, 6), framework: Some((4, 6, 1)), core_app: (1, 0, 0) },
    StandardSupport { standard: (2, 0), framework: Some((4, 6, 1)), core_app: (2, 0, 0) },
    StandardSupport { standard: (2, 1), framework: None, core_app: (3, 0, 0) },
];

fn parse_dotted(input: &str) -> Option<(u32, u32, u32)> {
    if input.is_empty() {
        return Some((0, 0, 0));
    }
    let mut parts = input.split('.').map(|p| p.parse::<u32>().ok());
    let major = parts.next().flatten()?;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);
    Some((major, minor, patch))
}
