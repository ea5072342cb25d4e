//! Resource kinds partitioning the store.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The closed set of record kinds. A hash is only meaningful paired with its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    ApplicationInfo = 0,
    Sampler = 1,
    DescriptorSetLayout = 2,
    PipelineLayout = 3,
    ShaderModule = 4,
    RenderPass = 5,
    GraphicsPipeline = 6,
    ComputePipeline = 7,
}

/// Number of resource kinds.
pub const KIND_COUNT: usize = 8;

impl ResourceKind {
    /// All kinds, in tag order.
    pub const ALL: [ResourceKind; KIND_COUNT] = [
        ResourceKind::ApplicationInfo,
        ResourceKind::Sampler,
        ResourceKind::DescriptorSetLayout,
        ResourceKind::PipelineLayout,
        ResourceKind::ShaderModule,
        ResourceKind::RenderPass,
        ResourceKind::GraphicsPipeline,
        ResourceKind::ComputePipeline,
    ];

    /// Kinds decoded during the scan pass.
    ///
    /// Session records come first so the current session is known before any
    /// pipeline is seen, and every kind a pipeline can reference is decoded
    /// before the pipelines. Shader modules are never decoded.
    pub const SCAN_ORDER: [ResourceKind; 7] = [
        ResourceKind::ApplicationInfo,
        ResourceKind::Sampler,
        ResourceKind::DescriptorSetLayout,
        ResourceKind::PipelineLayout,
        ResourceKind::RenderPass,
        ResourceKind::GraphicsPipeline,
        ResourceKind::ComputePipeline,
    ];

    /// Kinds copied from their reachable sets after the scan.
    pub const COPY_ORDER: [ResourceKind; 7] = [
        ResourceKind::Sampler,
        ResourceKind::DescriptorSetLayout,
        ResourceKind::ShaderModule,
        ResourceKind::RenderPass,
        ResourceKind::PipelineLayout,
        ResourceKind::GraphicsPipeline,
        ResourceKind::ComputePipeline,
    ];

    /// Order of lines in the prune report.
    pub const REPORT_ORDER: [ResourceKind; KIND_COUNT] = [
        ResourceKind::ApplicationInfo,
        ResourceKind::ShaderModule,
        ResourceKind::Sampler,
        ResourceKind::DescriptorSetLayout,
        ResourceKind::PipelineLayout,
        ResourceKind::RenderPass,
        ResourceKind::GraphicsPipeline,
        ResourceKind::ComputePipeline,
    ];

    /// Convert to tag byte (record headers).
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Index into per-kind tables.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Parse from tag byte.
    pub fn from_tag(tag: u8) -> Result<Self> {
        Self::ALL
            .get(tag as usize)
            .copied()
            .ok_or_else(|| Error::unknown_kind(format!("tag {}", tag)))
    }

    /// Directory name under `records/`, also accepted on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::ApplicationInfo => "application_info",
            ResourceKind::Sampler => "sampler",
            ResourceKind::DescriptorSetLayout => "descriptor_set_layout",
            ResourceKind::PipelineLayout => "pipeline_layout",
            ResourceKind::ShaderModule => "shader_module",
            ResourceKind::RenderPass => "render_pass",
            ResourceKind::GraphicsPipeline => "graphics_pipeline",
            ResourceKind::ComputePipeline => "compute_pipeline",
        }
    }

    /// Human-readable name used in reports.
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceKind::ApplicationInfo => "AppInfo",
            ResourceKind::Sampler => "Sampler",
            ResourceKind::DescriptorSetLayout => "Descriptor Set Layout",
            ResourceKind::PipelineLayout => "Pipeline Layout",
            ResourceKind::ShaderModule => "Shader Module",
            ResourceKind::RenderPass => "Render Pass",
            ResourceKind::GraphicsPipeline => "Graphics Pipeline",
            ResourceKind::ComputePipeline => "Compute Pipeline",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::unknown_kind(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_roundtrip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_tag(kind.tag()).unwrap(), kind);
            assert_eq!(ResourceKind::ALL[kind.index()], kind);
        }
        assert!(ResourceKind::from_tag(KIND_COUNT as u8).is_err());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(
            "descriptor-set-layout".parse::<ResourceKind>().unwrap(),
            ResourceKind::DescriptorSetLayout
        );
        assert_eq!(
            "Graphics_Pipeline".parse::<ResourceKind>().unwrap(),
            ResourceKind::GraphicsPipeline
        );
        assert!("pipeline".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_scan_order_excludes_shader_modules() {
        assert!(!ResourceKind::SCAN_ORDER.contains(&ResourceKind::ShaderModule));
        assert_eq!(ResourceKind::SCAN_ORDER[0], ResourceKind::ApplicationInfo);

        let position = |kind| {
            ResourceKind::SCAN_ORDER
                .iter()
                .position(|k| *k == kind)
                .unwrap()
        };
        for dependency in [
            ResourceKind::Sampler,
            ResourceKind::DescriptorSetLayout,
            ResourceKind::PipelineLayout,
            ResourceKind::RenderPass,
        ] {
            assert!(position(dependency) < position(ResourceKind::GraphicsPipeline));
            assert!(position(dependency) < position(ResourceKind::ComputePipeline));
        }
    }

    #[test]
    fn test_copy_order_covers_all_but_application_info() {
        for kind in ResourceKind::ALL {
            let copied = ResourceKind::COPY_ORDER.contains(&kind);
            assert_eq!(copied, kind != ResourceKind::ApplicationInfo, "{}", kind);
        }
    }
}
