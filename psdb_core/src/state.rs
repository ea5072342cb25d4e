//! Decoded state documents.
//!
//! A record's decoded payload is a JSON document holding creation infos keyed
//! by hash. Handle-typed fields (`layout`, `renderPass`, `module`,
//! `setLayouts`, `immutableSamplers`) carry the hash of the referenced record.

use crate::error::{Error, Result};
use crate::hash::Hash;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Current state document version.
pub const FORMAT_VERSION: u64 = 1;

/// Application and engine identity of a capture session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_name: Option<String>,
    pub application_version: u32,
    pub engine_version: u32,
    pub api_version: u32,
}

/// Enabled physical device features, by feature name.
pub type DeviceFeatures = BTreeMap<String, bool>;

impl ApplicationInfo {
    /// Fingerprint of an application/feature combination.
    ///
    /// Observational only; it plays no part in reachability.
    pub fn feature_hash(
        app: Option<&ApplicationInfo>,
        features: Option<&DeviceFeatures>,
    ) -> Result<Hash> {
        let canonical = serde_json::to_vec(&(app, features))?;
        Ok(Hash::digest(&canonical))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SamplerCreateInfo {
    pub flags: u32,
    pub mag_filter: u32,
    pub min_filter: u32,
    pub mipmap_mode: u32,
    pub address_mode_u: u32,
    pub address_mode_v: u32,
    pub address_mode_w: u32,
    pub mip_lod_bias: f32,
    pub anisotropy_enable: bool,
    pub max_anisotropy: f32,
    pub compare_enable: bool,
    pub compare_op: u32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub border_color: u32,
    pub unnormalized_coordinates: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DescriptorSetLayoutBinding {
    pub binding: u32,
    pub descriptor_type: u32,
    pub descriptor_count: u32,
    pub stage_flags: u32,
    /// Sampler hashes; only the first `descriptor_count` entries are meaningful.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub immutable_samplers: Vec<Hash>,
}

impl DescriptorSetLayoutBinding {
    /// Non-null immutable samplers within `descriptor_count`.
    pub fn referenced_samplers(&self) -> impl Iterator<Item = Hash> + '_ {
        self.immutable_samplers
            .iter()
            .take(self.descriptor_count as usize)
            .copied()
            .filter(|hash| !hash.is_null())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DescriptorSetLayoutCreateInfo {
    pub flags: u32,
    pub bindings: Vec<DescriptorSetLayoutBinding>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushConstantRange {
    pub stage_flags: u32,
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineLayoutCreateInfo {
    pub flags: u32,
    pub set_layouts: Vec<Hash>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub push_constant_ranges: Vec<PushConstantRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShaderModuleCreateInfo {
    pub flags: u32,
    pub code_size: u64,
    /// SPIR-V words, encoded by the recorder.
    pub code: String,
}

/// Render pass description. Attachments and subpasses are kept opaque.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderPassCreateInfo {
    pub flags: u32,
    pub attachments: Vec<Value>,
    pub subpasses: Vec<Value>,
    pub dependencies: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineShaderStage {
    pub flags: u32,
    pub stage: u32,
    pub module: Hash,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub specialization_info: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraphicsPipelineCreateInfo {
    pub flags: u32,
    pub layout: Hash,
    /// Null for pipelines built without a render pass object.
    pub render_pass: Hash,
    pub subpass: u32,
    pub stages: Vec<PipelineShaderStage>,
    /// Fixed-function state, carried but not interpreted.
    #[serde(flatten)]
    pub fixed_function: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComputePipelineCreateInfo {
    pub flags: u32,
    pub layout: Hash,
    pub stage: PipelineShaderStage,
}

/// One decoded record payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDocument {
    pub version: u64,
    /// Session this record was captured under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Hash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_device_features: Option<DeviceFeatures>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub samplers: BTreeMap<Hash, SamplerCreateInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub set_layouts: BTreeMap<Hash, DescriptorSetLayoutCreateInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pipeline_layouts: BTreeMap<Hash, PipelineLayoutCreateInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub shader_modules: BTreeMap<Hash, ShaderModuleCreateInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub render_passes: BTreeMap<Hash, RenderPassCreateInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub graphics_pipelines: BTreeMap<Hash, GraphicsPipelineCreateInfo>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub compute_pipelines: BTreeMap<Hash, ComputePipelineCreateInfo>,
}

impl Default for StateDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl StateDocument {
    /// An empty document at the current version.
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION,
            session: None,
            application: None,
            physical_device_features: None,
            samplers: BTreeMap::new(),
            set_layouts: BTreeMap::new(),
            pipeline_layouts: BTreeMap::new(),
            shader_modules: BTreeMap::new(),
            render_passes: BTreeMap::new(),
            graphics_pipelines: BTreeMap::new(),
            compute_pipelines: BTreeMap::new(),
        }
    }

    /// Parse a decoded payload, rejecting unknown versions.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        let document: StateDocument = serde_json::from_slice(bytes)?;
        if document.version != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion {
                what: "state document",
                version: document.version,
            });
        }
        Ok(document)
    }

    /// Serialize to a decoded payload.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn with_session(mut self, session: Hash) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_application(mut self, app: ApplicationInfo, features: DeviceFeatures) -> Self {
        self.application = Some(app);
        self.physical_device_features = Some(features);
        self
    }

    pub fn with_sampler(mut self, hash: Hash, info: SamplerCreateInfo) -> Self {
        self.samplers.insert(hash, info);
        self
    }

    pub fn with_set_layout(mut self, hash: Hash, info: DescriptorSetLayoutCreateInfo) -> Self {
        self.set_layouts.insert(hash, info);
        self
    }

    pub fn with_pipeline_layout(mut self, hash: Hash, info: PipelineLayoutCreateInfo) -> Self {
        self.pipeline_layouts.insert(hash, info);
        self
    }

    pub fn with_shader_module(mut self, hash: Hash, info: ShaderModuleCreateInfo) -> Self {
        self.shader_modules.insert(hash, info);
        self
    }

    pub fn with_render_pass(mut self, hash: Hash, info: RenderPassCreateInfo) -> Self {
        self.render_passes.insert(hash, info);
        self
    }

    pub fn with_graphics_pipeline(mut self, hash: Hash, info: GraphicsPipelineCreateInfo) -> Self {
        self.graphics_pipelines.insert(hash, info);
        self
    }

    pub fn with_compute_pipeline(mut self, hash: Hash, info: ComputePipelineCreateInfo) -> Self {
        self.compute_pipelines.insert(hash, info);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_json_shape() {
        let document = StateDocument::new()
            .with_session(Hash::new(0xa1))
            .with_pipeline_layout(
                Hash::new(0x10),
                PipelineLayoutCreateInfo {
                    set_layouts: vec![Hash::new(0x20)],
                    ..Default::default()
                },
            );

        let json: Value = serde_json::from_slice(&document.to_json_bytes().unwrap()).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["session"], "00000000000000a1");
        assert_eq!(
            json["pipelineLayouts"]["0000000000000010"]["setLayouts"][0],
            "0000000000000020"
        );
        assert!(json.get("samplers").is_none());
    }

    #[test]
    fn test_document_parse_minimal() {
        let document = StateDocument::from_json_bytes(br#"{"version":1}"#).unwrap();
        assert_eq!(document, StateDocument::new());
    }

    #[test]
    fn test_document_rejects_bad_input() {
        assert!(matches!(
            StateDocument::from_json_bytes(br#"{"version":2}"#),
            Err(Error::UnsupportedVersion { version: 2, .. })
        ));
        assert!(matches!(
            StateDocument::from_json_bytes(b"{not json"),
            Err(Error::Decode { .. })
        ));
        assert!(StateDocument::from_json_bytes(br#"{}"#).is_err());
        assert!(
            StateDocument::from_json_bytes(br#"{"version":1,"samplers":{"xyz":{}}}"#).is_err()
        );
    }

    #[test]
    fn test_graphics_pipeline_keeps_fixed_function_state() {
        let json = br#"{
            "version": 1,
            "graphicsPipelines": {
                "00000000000000b0": {
                    "layout": "0000000000000010",
                    "renderPass": "0000000000000030",
                    "stages": [{ "stage": 1, "module": "0000000000000040", "name": "main" }],
                    "rasterizationState": { "cullMode": 2 }
                }
            }
        }"#;

        let document = StateDocument::from_json_bytes(json).unwrap();
        let pipeline = &document.graphics_pipelines[&Hash::new(0xb0)];
        assert_eq!(pipeline.layout, Hash::new(0x10));
        assert_eq!(pipeline.render_pass, Hash::new(0x30));
        assert_eq!(pipeline.stages[0].module, Hash::new(0x40));
        assert_eq!(
            pipeline.fixed_function["rasterizationState"]["cullMode"],
            2
        );
    }

    #[test]
    fn test_referenced_samplers_respects_count_and_null() {
        let binding = DescriptorSetLayoutBinding {
            descriptor_count: 3,
            immutable_samplers: vec![Hash::new(1), Hash::NULL, Hash::new(3), Hash::new(4)],
            ..Default::default()
        };
        let samplers: Vec<Hash> = binding.referenced_samplers().collect();
        assert_eq!(samplers, vec![Hash::new(1), Hash::new(3)]);

        let empty = DescriptorSetLayoutBinding {
            descriptor_count: 0,
            immutable_samplers: vec![Hash::new(1)],
            ..Default::default()
        };
        assert_eq!(empty.referenced_samplers().count(), 0);
    }

    #[test]
    fn test_feature_hash_depends_on_inputs() {
        let app = ApplicationInfo {
            application_name: Some("game".to_string()),
            ..Default::default()
        };
        let mut features = DeviceFeatures::new();
        features.insert("robustBufferAccess".to_string(), true);

        let a = ApplicationInfo::feature_hash(Some(&app), Some(&features)).unwrap();
        let b = ApplicationInfo::feature_hash(Some(&app), Some(&features)).unwrap();
        let c = ApplicationInfo::feature_hash(Some(&app), None).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
