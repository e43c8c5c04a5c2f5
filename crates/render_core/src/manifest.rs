//! Component manifest and the client navigation response built from it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::EngineError;
use crate::error::CoreError;
use crate::entry::{Props, RenderData};

/// Client-side files of one component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Public URL of the component's client bundle.
    pub client: String,
    /// Public URLs of the component's stylesheets, in load order.
    #[serde(default)]
    pub css: Vec<String>,
}

impl ManifestEntry {
    pub fn new(client: impl Into<String>, css: Vec<String>) -> Self {
        Self {
            client: client.into(),
            css,
        }
    }
}

/// Component id → client files, produced by the build step.
///
/// Read-only once the engine has loaded it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(HashMap<String, ManifestEntry>);

impl Manifest {
    pub fn new(entries: HashMap<String, ManifestEntry>) -> Self {
        Self(entries)
    }

    pub fn get(&self, component: &str) -> Option<&ManifestEntry> {
        self.0.get(component)
    }

    pub fn contains(&self, component: &str) -> bool {
        self.0.contains_key(component)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check every entry and the error page, in that order.
    ///
    /// The first unknown entry is reported with its index; an unknown error
    /// page is reported without one.
    ///
    /// An error page missing from the manifest fails every render, so each
    /// route using it answers with the plain-text 500.
    pub fn check(&self, data: &RenderData) -> Result<(), EngineError> {
        if data.entries.is_empty() {
            return Err(CoreError::NoEntries.into());
        }

        for (index, entry) in data.entries.iter().enumerate() {
            if !self.contains(&entry.component) {
                return Err(EngineError::ComponentNotFound {
                    component: entry.component.clone(),
                    index: Some(index),
                });
            }
        }

        if !self.contains(&data.error_page) {
            return Err(EngineError::ComponentNotFound {
                component: data.error_page.clone(),
                index: None,
            });
        }

        Ok(())
    }

    /// Stylesheets referenced by a render: entries first, then the error page.
    ///
    /// Each path appears once, at its first position.
    pub fn stylesheets<'a>(&'a self, data: &RenderData) -> Vec<&'a str> {
        let mut seen = Vec::new();
        let components = data
            .entries
            .iter()
            .map(|e| e.component.as_str())
            .chain(std::iter::once(data.error_page.as_str()));

        for component in components {
            let Some(entry) = self.get(component) else {
                continue;
            };
            for path in &entry.css {
                if !seen.contains(&path.as_str()) {
                    seen.push(path.as_str());
                }
            }
        }

        seen
    }

    /// Resolve a render into the JSON document used for client navigation.
    pub fn navigation(&self, data: &RenderData) -> Result<NavigationResponse, EngineError> {
        self.check(data)?;

        let resolve = |component: &str, props: Props| -> Result<NavigationEntry, EngineError> {
            let entry = self
                .get(component)
                .ok_or_else(|| EngineError::ComponentNotFound {
                    component: component.to_string(),
                    index: None,
                })?;
            Ok(NavigationEntry {
                file: entry.client.clone(),
                props,
                css: entry.css.clone(),
            })
        };

        let entries = data
            .entries
            .iter()
            .map(|e| resolve(&e.component, e.props.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        let error_page = resolve(&data.error_page, Props::new())?;

        Ok(NavigationResponse {
            entries,
            error_page,
        })
    }
}

impl FromIterator<(String, ManifestEntry)> for Manifest {
    fn from_iter<T: IntoIterator<Item = (String, ManifestEntry)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Build metadata loaded once by each engine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    pub manifest: Manifest,
    /// Path prefix under which client files are served.
    pub assets: String,
}

/// JSON body answered to client navigation requests.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavigationResponse {
    pub entries: Vec<NavigationEntry>,
    #[serde(rename = "errPage")]
    pub error_page: NavigationEntry,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavigationEntry {
    pub file: String,
    pub props: Props,
    pub css: Vec<String>,
}
