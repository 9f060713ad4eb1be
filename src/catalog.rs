//! The static catalog of tools and resources served by the dispatcher.
//!
//! Built once at startup with [`ToolCatalog::with_builtins`] and shared
//! read-only afterwards. Tool names are unique.

use serde::Serialize;

use crate::tools::{
    AggregateByCategoryTool, GetDocumentByIdTool, ListRecentDocumentsTool, SearchDocumentsTool,
    Tool,
};

/// URI scheme of every resource.
pub const RESOURCE_SCHEME: &str = "elasticsearch";

/// What a resource reads from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceFacet {
    /// Document count, store size and per-category counts.
    Stats,
    /// The index field mapping.
    Schema,
}

impl ResourceFacet {
    pub fn path(self) -> &'static str {
        match self {
            ResourceFacet::Stats => "stats",
            ResourceFacet::Schema => "schema",
        }
    }
}

/// A readable resource, listed by `resources/list`.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub uri: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    #[serde(skip)]
    pub facet: ResourceFacet,
}

impl Resource {
    fn for_index(index: &str, facet: ResourceFacet, name: &str, description: &str) -> Self {
        Self {
            uri: format!("{}://{}/{}", RESOURCE_SCHEME, index, facet.path()),
            name: name.to_string(),
            description: description.to_string(),
            mime_type: "application/json".to_string(),
            facet,
        }
    }
}

/// Registry of tools and resources.
pub struct ToolCatalog {
    tools: Vec<Box<dyn Tool>>,
    resources: Vec<Resource>,
}

impl ToolCatalog {
    /// The four built-in tools and the stats and schema resources of `index`.
    pub fn with_builtins(index: &str) -> Self {
        let mut catalog = Self {
            tools: Vec::new(),
            resources: Vec::new(),
        };
        catalog.register(Box::new(SearchDocumentsTool));
        catalog.register(Box::new(GetDocumentByIdTool));
        catalog.register(Box::new(AggregateByCategoryTool));
        catalog.register(Box::new(ListRecentDocumentsTool));

        catalog.resources.push(Resource::for_index(
            index,
            ResourceFacet::Stats,
            "Index statistics",
            "General statistics about the indexed data",
        ));
        catalog.resources.push(Resource::for_index(
            index,
            ResourceFacet::Schema,
            "Index schema",
            "Structure and field mapping of the Elasticsearch index",
        ));
        catalog
    }

    fn register(&mut self, tool: Box<dyn Tool>) {
        debug_assert!(
            self.find_tool(tool.name()).is_none(),
            "duplicate tool name: {}",
            tool.name()
        );
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find_tool(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Exact URI match.
    pub fn find_resource(&self, uri: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.uri == uri)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
