//! NeXus group resolution
//!
//! Turns a group annotated with NeXus attributes (`default`, `signal`,
//! `axes`, `auxiliary_signals`, `SILX_style`) into an [`NxData`] plot
//! model. Resolution chases `default` redirections first, then reads
//! everything else from the redirected group's direct children. All
//! entity and attribute reads go through the provider, so repeated
//! resolutions hit the session cache instead of the backend.

use std::collections::HashSet;

use tracing::warn;

use imview_core::{build_entity_path, DType, Entity, ErrorKind, ImviewError, ImviewResult};
use imview_providers::DataProvider;

use crate::models::{DatasetDef, NxData, NxInterpretation, SilxStyle};

/// Naming scheme for companion error datasets
pub trait ErrorsConvention: Send + Sync {
    /// Sibling names to try, in order of preference
    fn candidates(&self, dataset_name: &str, is_signal: bool) -> Vec<String>;
}

/// Default convention: `{name}_errors`, with a bare `errors` fallback
/// for the signal dataset
pub struct SuffixConvention;

impl ErrorsConvention for SuffixConvention {
    fn candidates(&self, dataset_name: &str, is_signal: bool) -> Vec<String> {
        let mut names = vec![format!("{dataset_name}_errors")];
        if is_signal {
            names.push("errors".to_string());
        }
        names
    }
}

/// Resolver for NeXus-annotated groups
pub struct NexusResolver {
    convention: Box<dyn ErrorsConvention>,
}

impl Default for NexusResolver {
    fn default() -> Self {
        Self::new(Box::new(SuffixConvention))
    }
}

impl NexusResolver {
    pub fn new(convention: Box<dyn ErrorsConvention>) -> Self {
        Self { convention }
    }

    /// Resolve the group at `path` into a plot model
    pub async fn resolve(
        &self,
        provider: &dyn DataProvider,
        path: &str,
    ) -> ImviewResult<NxData> {
        let group = self.follow_default(provider, path).await?;

        let signal_name = group
            .attr_str("signal")
            .ok_or_else(|| ImviewError::MissingSignal(group.path.clone()))?
            .to_string();
        let signal = group
            .child(&signal_name)
            .filter(|child| child.as_dataset().is_some())
            .ok_or_else(|| ImviewError::MissingSignal(group.path.clone()))?;

        let ndim = signal
            .as_dataset()
            .map(imview_core::Dataset::ndim)
            .unwrap_or(0);

        let signal_def = self.dataset_def(&group, signal, true);
        let interpretation = signal
            .attr_str("interpretation")
            .and_then(NxInterpretation::parse);

        // One axis slot per signal dimension; "." leaves a dimension bare
        let axis_names = group.attr_str_list("axes").unwrap_or_default();
        let mut axis_defs = Vec::with_capacity(ndim);
        for dim in 0..ndim {
            axis_defs.push(match axis_names.get(dim).map(String::as_str) {
                None | Some(".") => None,
                Some(name) => match group.child(name) {
                    Some(child) if child.as_dataset().is_some() => {
                        Some(self.dataset_def(&group, child, false))
                    }
                    _ => {
                        warn!("Axis dataset {name} not found in {}", group.path);
                        None
                    }
                },
            });
        }

        let aux_defs = group
            .attr_str_list("auxiliary_signals")
            .unwrap_or_default()
            .iter()
            .filter_map(|name| match group.child(name) {
                Some(child) if child.as_dataset().is_some() => {
                    Some(self.dataset_def(&group, child, false))
                }
                _ => {
                    warn!("Auxiliary signal {name} not found in {}", group.path);
                    None
                }
            })
            .collect();

        let silx_style = group
            .attr_value("SILX_style")
            .map(SilxStyle::parse)
            .unwrap_or_default();

        let title_dataset = group
            .child("title")
            .filter(|child| {
                child.as_dataset().is_some_and(|ds| {
                    ds.is_scalar() && matches!(ds.dtype, DType::String { .. })
                })
            })
            .cloned();

        Ok(NxData {
            title_dataset,
            signal_def,
            aux_defs,
            axis_defs,
            silx_style,
            interpretation,
        })
    }

    /// Chase `default` attributes until a group without one is reached
    ///
    /// Targets may be absolute or relative to the entity that declares
    /// them. A dangling target or a revisited path fails with
    /// `BrokenDefaultPath`.
    async fn follow_default(
        &self,
        provider: &dyn DataProvider,
        path: &str,
    ) -> ImviewResult<Entity> {
        let mut entity = provider.get_entity(path).await?;
        let mut visited = HashSet::from([entity.path.clone()]);

        while let Some(default) = entity.attr_str("default").map(str::to_string) {
            let target = if default.starts_with('/') {
                default
            } else {
                build_entity_path(&entity.path, &default)
            };

            if !visited.insert(target.clone()) {
                return Err(ImviewError::BrokenDefaultPath(target));
            }

            entity = provider.get_entity(&target).await.map_err(|e| {
                match e.kind() {
                    ErrorKind::EntityNotFound | ErrorKind::FileNotFound => {
                        ImviewError::BrokenDefaultPath(target.clone())
                    }
                    _ => e,
                }
            })?;
        }

        Ok(entity)
    }

    fn dataset_def(&self, group: &Entity, entity: &Entity, is_signal: bool) -> DatasetDef {
        let errors = self
            .convention
            .candidates(&entity.name, is_signal)
            .iter()
            .find_map(|name| {
                group
                    .child(name)
                    .filter(|sibling| sibling.as_dataset().is_some())
                    .cloned()
            });

        DatasetDef {
            dataset: entity.clone(),
            label: entity.attr_str("long_name").map(str::to_string),
            unit: entity.attr_str("units").map(str::to_string),
            errors,
        }
    }
}
