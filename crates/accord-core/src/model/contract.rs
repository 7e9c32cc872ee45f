use std::fmt;

use super::interaction::Interaction;

/// Contract artifact specification version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpecVersion {
    #[default]
    V2,
    V3,
}

impl SpecVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpecVersion::V2 => "2.0.0",
            SpecVersion::V3 => "3.0.0",
        }
    }

    /// Accepts `2`, `2.0`, `2.0.0` and likewise for version 3.
    pub fn parse(version: &str) -> Option<Self> {
        let major = version.trim().split('.').next()?;
        match major {
            "2" => Some(SpecVersion::V2),
            "3" => Some(SpecVersion::V3),
            _ => None,
        }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered interactions between one consumer and one provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub(crate) consumer: String,
    pub(crate) provider: String,
    pub(crate) spec_version: SpecVersion,
    pub(crate) interactions: Vec<Interaction>,
}

impl Contract {
    pub fn consumer(&self) -> &str {
        &self.consumer
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn spec_version(&self) -> SpecVersion {
        self.spec_version
    }

    pub fn interactions(&self) -> &[Interaction] {
        &self.interactions
    }

    pub fn interaction(&self, index: usize) -> Option<&Interaction> {
        self.interactions.get(index)
    }

    /// True when the contract describes messages rather than HTTP exchanges.
    pub fn is_message_contract(&self) -> bool {
        !self.interactions.is_empty() && self.interactions.iter().all(Interaction::is_message)
    }

    /// HTTP interactions with their declaration index.
    pub fn http_interactions(&self) -> impl Iterator<Item = (usize, &Interaction)> {
        self.interactions
            .iter()
            .enumerate()
            .filter(|(_, interaction)| !interaction.is_message())
    }
}
