//! Ownership-tracking front for a [`MapHandle`].
//!
//! The parent view owns the registry (and through it the map). Components
//! register sources, layers and listeners under an [`OwnerId`]; ids claimed
//! by one owner are refused to every other, and [`MapRegistry::release`]
//! removes everything an owner registered.

use crate::engine::{EventKind, Listener, ListenerId, MapHandle};
use crate::engine::style::{GeoJsonSource, LayerSpec, Visibility};
use crate::error::MapError;
use geojson::FeatureCollection;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OwnerId(u32);

#[derive(Clone, Debug, PartialEq, Eq)]
enum Resource {
    Source(String),
    Layer(String),
}

struct Claim {
    owner: OwnerId,
    resource: Resource,
}

pub struct MapRegistry<M: MapHandle> {
    map: M,
    owners: Vec<String>,
    /// In registration order
    claims: Vec<Claim>,
    listeners: Vec<(OwnerId, ListenerId)>,
}

impl<M: MapHandle> MapRegistry<M> {
    pub fn new(map: M) -> Self {
        Self {
            map,
            owners: Vec::new(),
            claims: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    /// Direct access for the parent view (input, camera, rendering)
    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    /// Allocate an owner; the label only appears in conflict errors and logs
    pub fn register_owner(&mut self, label: &str) -> OwnerId {
        self.owners.push(label.to_string());
        OwnerId(self.owners.len() as u32 - 1)
    }

    fn owner_label(&self, owner: OwnerId) -> &str {
        self.owners.get(owner.0 as usize).map_or("unknown", String::as_str)
    }

    fn claimant(&self, resource: &Resource) -> Option<OwnerId> {
        self.claims.iter().find(|c| &c.resource == resource).map(|c| c.owner)
    }

    fn check(&self, owner: OwnerId, resource: &Resource, id: &str) -> Result<(), MapError> {
        match self.claimant(resource) {
            Some(other) if other != owner => Err(MapError::OwnedElsewhere {
                id: id.to_string(),
                owner: self.owner_label(other).to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Add a source unless it already exists. Returns whether it was added.
    pub fn ensure_source(&mut self, owner: OwnerId, id: &str, source: GeoJsonSource) -> Result<bool, MapError> {
        let resource = Resource::Source(id.to_string());
        self.check(owner, &resource, id)?;
        if self.map.has_source(id) {
            return Ok(false);
        }
        self.map.add_source(id, source)?;
        self.claims.push(Claim { owner, resource });
        Ok(true)
    }

    /// Add a layer unless it already exists. Returns whether it was added.
    pub fn ensure_layer(&mut self, owner: OwnerId, layer: LayerSpec) -> Result<bool, MapError> {
        let resource = Resource::Layer(layer.id.clone());
        self.check(owner, &resource, &layer.id)?;
        if self.map.has_layer(&layer.id) {
            return Ok(false);
        }
        self.map.add_layer(layer)?;
        self.claims.push(Claim { owner, resource });
        Ok(true)
    }

    pub fn set_source_data(&mut self, owner: OwnerId, id: &str, data: Arc<FeatureCollection>) -> Result<(), MapError> {
        self.check(owner, &Resource::Source(id.to_string()), id)?;
        self.map.set_source_data(id, data)
    }

    pub fn set_layer_visibility(&mut self, owner: OwnerId, id: &str, visibility: Visibility) -> Result<(), MapError> {
        self.check(owner, &Resource::Layer(id.to_string()), id)?;
        self.map.set_layer_visibility(id, visibility)
    }

    pub fn set_glyphs(&mut self, url_template: &str) {
        self.map.set_glyphs(url_template);
    }

    pub fn listen(&mut self, owner: OwnerId, kind: EventKind, layer_id: &str, listener: Listener) -> ListenerId {
        let id = self.map.on(kind, layer_id, listener);
        self.listeners.push((owner, id));
        id
    }

    /// Resource ids currently held by an owner, in registration order
    pub fn owned_by(&self, owner: OwnerId) -> Vec<&str> {
        self.claims
            .iter()
            .filter(|c| c.owner == owner)
            .map(|c| match &c.resource {
                Resource::Source(id) | Resource::Layer(id) => id.as_str(),
            })
            .collect()
    }

    /// Remove every listener, layer and source the owner registered.
    /// Layers go before sources so no source is removed while in use.
    pub fn release(&mut self, owner: OwnerId) {
        let label = self.owner_label(owner).to_string();

        let (mine, rest): (Vec<_>, Vec<_>) = self.listeners.drain(..).partition(|(o, _)| *o == owner);
        self.listeners = rest;
        for (_, id) in mine {
            self.map.off(id);
        }

        let (mine, rest): (Vec<_>, Vec<_>) = self.claims.drain(..).partition(|c| c.owner == owner);
        self.claims = rest;
        let (layers, sources): (Vec<_>, Vec<_>) =
            mine.into_iter().partition(|c| matches!(c.resource, Resource::Layer(_)));

        for claim in layers.into_iter().rev().chain(sources.into_iter().rev()) {
            let result = match &claim.resource {
                Resource::Layer(id) if self.map.has_layer(id) => self.map.remove_layer(id),
                Resource::Source(id) if self.map.has_source(id) => self.map.remove_source(id),
                _ => Ok(()),
            };
            if let Err(err) = result {
                warn!(owner = %label, %err, "failed to release map resource");
            }
        }
        debug!(owner = %label, "released map resources");
    }
}
