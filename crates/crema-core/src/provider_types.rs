use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Image hosting providers
///
/// Defined in core because it's used in configuration, upload results and
/// the relay service.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Multipart upload with an unsigned preset (canonical provider)
    #[default]
    Cloudinary,
    /// Base64 JSON relay through the same-origin endpoint (deprecated adapter)
    Imgbb,
}

impl ProviderKind {
    /// Hostname the provider serves delivered images from
    pub fn delivery_host(self) -> &'static str {
        match self {
            ProviderKind::Cloudinary => "res.cloudinary.com",
            ProviderKind::Imgbb => "i.ibb.co",
        }
    }

    pub fn is_deprecated(self) -> bool {
        matches!(self, ProviderKind::Imgbb)
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cloudinary" => Ok(ProviderKind::Cloudinary),
            "imgbb" => Ok(ProviderKind::Imgbb),
            _ => Err(anyhow::anyhow!("Invalid upload provider: {}", s)),
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProviderKind::Cloudinary => write!(f, "cloudinary"),
            ProviderKind::Imgbb => write!(f, "imgbb"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider() {
        assert_eq!(
            "cloudinary".parse::<ProviderKind>().unwrap(),
            ProviderKind::Cloudinary
        );
        assert_eq!(" IMGBB ".parse::<ProviderKind>().unwrap(), ProviderKind::Imgbb);
        assert!("s3".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for kind in [ProviderKind::Cloudinary, ProviderKind::Imgbb] {
            assert_eq!(kind.to_string().parse::<ProviderKind>().unwrap(), kind);
        }
    }
}
