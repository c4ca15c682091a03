//! Declarative metadata for the synthetic service under test.
//!
//! A [`Workspace`] names the entity sets the service exposes and the
//! resource types behind them. It is constructed once per suite and shared
//! read-only by the verifiers that need to recompute expectations (key
//! shapes, concurrency tokens, navigation link targets).

pub mod sample;

use anyhow::{Result, bail};

/// A structural property of a resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceProperty {
    pub name: String,
    /// Part of the entity key.
    pub is_key: bool,
    /// Participates in ETag computation.
    pub concurrency_token: bool,
}

/// A navigation property pointing at another entity set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationProperty {
    pub name: String,
    pub target_set: String,
    /// One-to-many when true, single-valued otherwise.
    pub collection: bool,
}

/// An entity type: named properties plus navigations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    pub name: String,
    properties: Vec<ResourceProperty>,
    navigations: Vec<NavigationProperty>,
}

impl ResourceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            navigations: Vec::new(),
        }
    }

    /// Add a key property.
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.properties.push(ResourceProperty {
            name: name.into(),
            is_key: true,
            concurrency_token: false,
        });
        self
    }

    /// Add a plain property.
    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.properties.push(ResourceProperty {
            name: name.into(),
            is_key: false,
            concurrency_token: false,
        });
        self
    }

    /// Add a property that participates in concurrency-token (ETag)
    /// computation.
    pub fn concurrency_property(mut self, name: impl Into<String>) -> Self {
        self.properties.push(ResourceProperty {
            name: name.into(),
            is_key: false,
            concurrency_token: true,
        });
        self
    }

    /// Add a navigation property targeting another entity set.
    pub fn navigation(
        mut self,
        name: impl Into<String>,
        target_set: impl Into<String>,
        collection: bool,
    ) -> Self {
        self.navigations.push(NavigationProperty {
            name: name.into(),
            target_set: target_set.into(),
            collection,
        });
        self
    }

    pub fn properties(&self) -> &[ResourceProperty] {
        &self.properties
    }

    pub fn navigations(&self) -> &[NavigationProperty] {
        &self.navigations
    }

    pub fn navigation_named(&self, name: &str) -> Option<&NavigationProperty> {
        self.navigations.iter().find(|nav| nav.name == name)
    }

    pub fn key_properties(&self) -> impl Iterator<Item = &ResourceProperty> {
        self.properties.iter().filter(|prop| prop.is_key)
    }

    pub fn concurrency_properties(&self) -> impl Iterator<Item = &ResourceProperty> {
        self.properties.iter().filter(|prop| prop.concurrency_token)
    }

    pub fn has_concurrency_tokens(&self) -> bool {
        self.properties.iter().any(|prop| prop.concurrency_token)
    }

    /// Key property names in declaration order.
    pub fn key_names(&self) -> Vec<&str> {
        self.key_properties().map(|prop| prop.name.as_str()).collect()
    }
}

/// An exposed entity set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSet {
    pub name: String,
    pub resource_type: String,
    /// Server-driven paging limit; responses with exactly this many rows
    /// carry a next-link.
    pub page_limit: Option<usize>,
}

/// The service container: entity sets plus the types behind them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub name: String,
    sets: Vec<ResourceSet>,
    types: Vec<ResourceType>,
}

impl Workspace {
    pub fn builder(name: impl Into<String>) -> WorkspaceBuilder {
        WorkspaceBuilder {
            name: name.into(),
            sets: Vec::new(),
            types: Vec::new(),
        }
    }

    pub fn set(&self, name: &str) -> Option<&ResourceSet> {
        self.sets.iter().find(|set| set.name == name)
    }

    pub fn sets(&self) -> &[ResourceSet] {
        &self.sets
    }

    pub fn resource_type(&self, name: &str) -> Option<&ResourceType> {
        self.types.iter().find(|rtype| rtype.name == name)
    }

    /// Resource type backing the named entity set.
    pub fn type_of_set(&self, set_name: &str) -> Option<&ResourceType> {
        let set = self.set(set_name)?;
        self.resource_type(&set.resource_type)
    }
}

/// Builder validating cross-references at `build` time.
#[derive(Debug)]
pub struct WorkspaceBuilder {
    name: String,
    sets: Vec<ResourceSet>,
    types: Vec<ResourceType>,
}

impl WorkspaceBuilder {
    pub fn resource_type(mut self, rtype: ResourceType) -> Self {
        self.types.push(rtype);
        self
    }

    pub fn set(mut self, name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        self.sets.push(ResourceSet {
            name: name.into(),
            resource_type: resource_type.into(),
            page_limit: None,
        });
        self
    }

    pub fn paged_set(
        mut self,
        name: impl Into<String>,
        resource_type: impl Into<String>,
        page_limit: usize,
    ) -> Self {
        self.sets.push(ResourceSet {
            name: name.into(),
            resource_type: resource_type.into(),
            page_limit: Some(page_limit),
        });
        self
    }

    /// Validate cross-references and produce the workspace.
    pub fn build(self) -> Result<Workspace> {
        let workspace = Workspace {
            name: self.name,
            sets: self.sets,
            types: self.types,
        };
        for set in &workspace.sets {
            if workspace.resource_type(&set.resource_type).is_none() {
                bail!(
                    "set {} references unknown resource type {}",
                    set.name,
                    set.resource_type
                );
            }
        }
        for rtype in &workspace.types {
            if rtype.key_properties().next().is_none() {
                bail!("resource type {} has no key properties", rtype.name);
            }
            for nav in rtype.navigations() {
                if workspace.set(&nav.target_set).is_none() {
                    bail!(
                        "navigation {}.{} targets unknown set {}",
                        rtype.name,
                        nav.name,
                        nav.target_set
                    );
                }
            }
        }
        Ok(workspace)
    }
}
