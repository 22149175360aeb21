//! Hub-and-spoke identifier routing.
//!
//! Every registered alignment maps the hub scheme to one spoke scheme. A
//! conversion between two spokes takes exactly two hops: reverse through the
//! source spoke's alignment to the hub, then forward through the target's.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::align::Alignment;
use crate::error::{RouteError, RouteResult};
use crate::identifier::{dispatch_infallible, strip_default, Conversion, Converted, IdInput};

/// Scheme name → alignment from the hub to that scheme.
#[derive(Debug, Clone)]
pub struct SchemeRegistry {
    hub: String,
    alignments: BTreeMap<String, Arc<Alignment>>,
}

/// Resolved path for one `(from, to)` pair; identical for every element.
enum Route<'a> {
    Identity,
    Forward(&'a Alignment),
    ToHub(&'a Alignment),
    ViaHub {
        back: &'a Alignment,
        forward: &'a Alignment,
    },
}

impl SchemeRegistry {
    pub fn new(hub: impl Into<String>) -> Self {
        Self {
            hub: hub.into(),
            alignments: BTreeMap::new(),
        }
    }

    pub fn hub(&self) -> &str {
        &self.hub
    }

    /// Register the alignment from the hub to `scheme`, replacing any earlier one.
    pub fn register(&mut self, scheme: impl Into<String>, alignment: Arc<Alignment>) {
        let scheme = scheme.into();
        tracing::debug!(hub = %self.hub, scheme = %scheme, "registered alignment");
        self.alignments.insert(scheme, alignment);
    }

    pub fn get(&self, scheme: &str) -> Option<&Arc<Alignment>> {
        self.alignments.get(scheme)
    }

    pub fn is_empty(&self) -> bool {
        self.alignments.is_empty()
    }

    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.alignments.keys().map(String::as_str)
    }

    /// The hub plus every registered scheme.
    pub fn available_conversions(&self) -> BTreeSet<String> {
        std::iter::once(self.hub.clone())
            .chain(self.alignments.keys().cloned())
            .collect()
    }

    fn unsupported(&self, from: &str, to: &str) -> RouteError {
        let available: Vec<String> = self.available_conversions().into_iter().collect();
        RouteError::Unsupported {
            from: from.to_string(),
            to: to.to_string(),
            available: available.join(", "),
        }
    }

    fn plan(&self, facade: &str, from: &str, to: &str) -> RouteResult<Route<'_>> {
        if from == to {
            return Ok(Route::Identity);
        }
        if self.alignments.is_empty() {
            return Err(RouteError::NoMappings {
                facade: facade.to_string(),
            });
        }
        if from == self.hub {
            return match self.alignments.get(to) {
                Some(forward) => Ok(Route::Forward(forward)),
                None => Err(self.unsupported(from, to)),
            };
        }
        let Some(back) = self.alignments.get(from) else {
            return Err(self.unsupported(from, to));
        };
        if to == self.hub {
            return Ok(Route::ToHub(back));
        }
        match self.alignments.get(to) {
            Some(forward) => Ok(Route::ViaHub { back, forward }),
            None => Err(self.unsupported(from, to)),
        }
    }

    /// Convert identifiers of scheme `from` into scheme `to`.
    ///
    /// `facade` names the owner in [`RouteError::NoMappings`]. With `strip`,
    /// each input loses its namespace before the first lookup; batch results
    /// stay keyed by the original inputs. `from == to` returns the input ids
    /// unchanged, without stripping. An empty batch converts to an empty map
    /// whatever the schemes.
    pub fn convert(
        &self,
        facade: &str,
        input: &IdInput,
        from: &str,
        to: &str,
        strip: bool,
    ) -> RouteResult<Converted> {
        if input.is_empty() {
            return Ok(Converted::Many(BTreeMap::new()));
        }
        let route = self.plan(facade, from, to)?;
        let normalise = strip && !matches!(route, Route::Identity);
        Ok(dispatch_infallible(input, |id| {
            if normalise {
                route.resolve(&strip_default(id))
            } else {
                route.resolve(id)
            }
        }))
    }
}

impl Route<'_> {
    fn resolve(&self, id: &str) -> Conversion {
        match self {
            Route::Identity => Conversion::Mapped(id.to_string()),
            Route::Forward(forward) => forward.lookup(id, false),
            Route::ToHub(back) => back.lookup(id, true),
            Route::ViaHub { back, forward } => match back.lookup(id, true) {
                Conversion::Mapped(hub_id) => forward.lookup(&hub_id, false),
                Conversion::NoMapping => Conversion::NoMapping,
            },
        }
    }
}
