//! Client tuple models
//!
//! A tuple is one combination of client configurations exercised together
//! in a single test execution.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single client configuration under test
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Browser name (chrome, firefox, safari, ...)
    pub browser_name: String,

    /// Browser version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Platform (linux, windows, mac, android, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Firefox profile path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Chrome extension path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,

    /// Extra capabilities passed through to the unit
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub capabilities: HashMap<String, String>,
}

impl Client {
    pub fn new(browser_name: impl Into<String>) -> Self {
        Self {
            browser_name: browser_name.into(),
            version: None,
            platform: None,
            profile: None,
            extension: None,
            capabilities: HashMap::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn is_firefox(&self) -> bool {
        self.browser_name.eq_ignore_ascii_case("firefox")
    }

    pub fn is_chrome(&self) -> bool {
        self.browser_name.eq_ignore_ascii_case("chrome")
    }

    /// Electron apps report themselves as chrome with an "electron" version
    pub fn is_electron(&self) -> bool {
        self.version
            .as_deref()
            .map(|v| v.contains("electron"))
            .unwrap_or(false)
    }

    fn has_profile(&self) -> bool {
        self.profile.as_deref().is_some_and(|p| !p.is_empty())
    }

    fn has_extension(&self) -> bool {
        self.extension.as_deref().is_some_and(|e| !e.is_empty())
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.browser_name)?;
        if let Some(version) = &self.version {
            write!(f, " {version}")?;
        }
        if let Some(platform) = &self.platform {
            write!(f, " ({platform})")?;
        }
        Ok(())
    }
}

/// Ordered, fixed-size combination of clients
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tuple {
    clients: Vec<Client>,
}

impl Tuple {
    pub fn new(clients: Vec<Client>) -> Self {
        Self { clients }
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Replace per-client profile and extension paths with the run-wide ones.
    ///
    /// Firefox clients that ask for a profile get `firefox_profile`. Chrome
    /// clients (electron excluded) that ask for an extension get
    /// `chrome_extension`. Clients that ask for neither are left alone.
    pub fn with_client_defaults(
        mut self,
        firefox_profile: Option<&str>,
        chrome_extension: Option<&str>,
    ) -> Self {
        for client in &mut self.clients {
            if client.is_firefox() && client.has_profile() {
                client.profile = firefox_profile.map(str::to_string);
            }
            if client.is_chrome()
                && client.version.is_some()
                && !client.is_electron()
                && client.has_extension()
            {
                client.extension = chrome_extension.map(str::to_string);
            }
        }
        self
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, client) in self.clients.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{client}")?;
        }
        write!(f, "]")
    }
}

impl From<Vec<Client>> for Tuple {
    fn from(clients: Vec<Client>) -> Self {
        Self::new(clients)
    }
}

#[cfg(test)]
impl Client {
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }
}
