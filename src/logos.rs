// src/logos.rs
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoKind {
    Profile,
    Primary,
    Fallback,
    Placeholder,
}

impl LogoKind {
    /// Source to try after `self` failed to load. The placeholder always renders.
    pub fn next(self) -> Option<LogoKind> {
        match self {
            LogoKind::Profile => Some(LogoKind::Primary),
            LogoKind::Primary => Some(LogoKind::Fallback),
            LogoKind::Fallback => Some(LogoKind::Placeholder),
            LogoKind::Placeholder => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogoSource {
    pub kind: LogoKind,
    pub url: String,
}

pub fn primary_logo(symbol: &str) -> String {
    format!(
        "https://static2.finnhub.io/file/publicdatany/finnhubimage/stock_logo/{}.png",
        symbol.to_uppercase()
    )
}

pub fn fallback_logo(symbol: &str) -> String {
    format!(
        "https://financialmodelingprep.com/image-stock/{}.png",
        symbol.to_uppercase()
    )
}

/// Initials badge as an inline SVG data URL.
pub fn placeholder_logo(symbol: &str) -> String {
    let letters: String = symbol.trim().to_uppercase().chars().take(2).collect();
    let svg = format!(
        r##"<svg width="40" height="40" xmlns="http://www.w3.org/2000/svg"><rect width="40" height="40" fill="#3B82F6"/><text x="50%" y="50%" font-family="Arial, sans-serif" font-size="16" font-weight="bold" fill="white" text-anchor="middle" dominant-baseline="middle">{}</text></svg>"##,
        letters
    );
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

/// Every candidate logo for `symbol`, in the order a client should try them.
pub fn logo_chain(symbol: &str, profile_logo: Option<&str>) -> Vec<LogoSource> {
    let profile_logo = profile_logo.map(str::trim).filter(|u| !u.is_empty());
    let mut kind = if profile_logo.is_some() {
        Some(LogoKind::Profile)
    } else {
        Some(LogoKind::Primary)
    };

    let mut chain = Vec::with_capacity(4);
    while let Some(current) = kind {
        let url = match current {
            LogoKind::Profile => profile_logo.unwrap_or_default().to_string(),
            LogoKind::Primary => primary_logo(symbol),
            LogoKind::Fallback => fallback_logo(symbol),
            LogoKind::Placeholder => placeholder_logo(symbol),
        };
        chain.push(LogoSource { kind: current, url });
        kind = current.next();
    }
    chain
}
