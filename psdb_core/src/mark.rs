//! Reachability marking over decoded records.
//!
//! [`PruneReplayer`] is the [`StateCreator`] fed during the scan pass. Every
//! handle it returns is the object's own hash, so references seen in later
//! records are hashes too. Descriptor set layouts and pipeline layouts are
//! kept by hash until a pipeline reaches them; pipelines accepted by the
//! session filter are roots and mark everything they reference.

use crate::error::Result;
use crate::hash::Hash;
use crate::kind::{KIND_COUNT, ResourceKind};
use crate::replay::StateCreator;
use crate::state::{
    ApplicationInfo, ComputePipelineCreateInfo, DescriptorSetLayoutCreateInfo, DeviceFeatures,
    GraphicsPipelineCreateInfo, PipelineLayoutCreateInfo, RenderPassCreateInfo,
    SamplerCreateInfo, ShaderModuleCreateInfo,
};
use std::collections::{BTreeSet, HashMap};
use tracing::{info, warn};

/// Per-kind sets of hashes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KindSets {
    sets: [BTreeSet<Hash>; KIND_COUNT],
}

impl KindSets {
    /// Hashes recorded for `kind`, ascending.
    pub fn get(&self, kind: ResourceKind) -> &BTreeSet<Hash> {
        &self.sets[kind.index()]
    }

    pub fn contains(&self, kind: ResourceKind, hash: &Hash) -> bool {
        self.sets[kind.index()].contains(hash)
    }

    /// Insert; returns false if already present.
    fn insert(&mut self, kind: ResourceKind, hash: Hash) -> bool {
        self.sets[kind.index()].insert(hash)
    }
}

/// Graph extractor and mark engine for one prune run.
#[derive(Debug, Default)]
pub struct PruneReplayer {
    reachable: KindSets,
    candidates: KindSets,
    set_layouts: HashMap<Hash, DescriptorSetLayoutCreateInfo>,
    pipeline_layouts: HashMap<Hash, PipelineLayoutCreateInfo>,
    current_session: Hash,
    session_filter: Option<Hash>,
    allow_session_info: bool,
    feature_hash: Option<Hash>,
}

impl PruneReplayer {
    /// Only pipelines captured under `session_filter` become roots, if set.
    pub fn new(session_filter: Option<Hash>) -> Self {
        Self {
            session_filter,
            ..Default::default()
        }
    }

    /// Log session info events. Enabled while scanning application info records.
    pub fn set_allow_session_info(&mut self, allow: bool) {
        self.allow_session_info = allow;
    }

    /// Feature hash of the last session info event seen while allowed.
    pub fn feature_hash(&self) -> Option<Hash> {
        self.feature_hash
    }

    /// Session tagging the events currently being decoded.
    pub fn current_session(&self) -> Hash {
        self.current_session
    }

    /// Hashes reached from a root so far.
    pub fn reachable(&self) -> &KindSets {
        &self.reachable
    }

    /// Hashes of every decoded creation event, root or not.
    pub fn candidates(&self) -> &KindSets {
        &self.candidates
    }

    /// Consume the replayer, keeping the reachable sets.
    pub fn into_reachable(self) -> KindSets {
        self.reachable
    }

    fn is_root_session(&self) -> bool {
        self.session_filter
            .is_none_or(|filter| filter == self.current_session)
    }

    fn mark_sampler(&mut self, hash: Hash) {
        if !hash.is_null() {
            self.reachable.insert(ResourceKind::Sampler, hash);
        }
    }

    fn mark_descriptor_set_layout(&mut self, hash: Hash) {
        if hash.is_null() || !self.reachable.insert(ResourceKind::DescriptorSetLayout, hash) {
            return;
        }

        // Absent when the layout was never decoded; left unexpanded.
        let Some(info) = self.set_layouts.get(&hash) else {
            return;
        };
        let samplers: Vec<Hash> = info
            .bindings
            .iter()
            .flat_map(|binding| binding.referenced_samplers())
            .collect();

        for sampler in samplers {
            self.mark_sampler(sampler);
        }
    }

    fn mark_pipeline_layout(&mut self, hash: Hash) {
        if hash.is_null() || !self.reachable.insert(ResourceKind::PipelineLayout, hash) {
            return;
        }

        let Some(info) = self.pipeline_layouts.get(&hash) else {
            return;
        };
        let set_layouts = info.set_layouts.clone();

        for set_layout in set_layouts {
            self.mark_descriptor_set_layout(set_layout);
        }
    }

    fn mark_leaf(&mut self, kind: ResourceKind, hash: Hash) {
        if !hash.is_null() {
            self.reachable.insert(kind, hash);
        }
    }

    fn mark_graphics_pipeline(&mut self, hash: Hash, info: &GraphicsPipelineCreateInfo) {
        if !self.reachable.insert(ResourceKind::GraphicsPipeline, hash) {
            return;
        }

        self.mark_pipeline_layout(info.layout);
        self.mark_leaf(ResourceKind::RenderPass, info.render_pass);
        for stage in &info.stages {
            self.mark_leaf(ResourceKind::ShaderModule, stage.module);
        }
    }

    fn mark_compute_pipeline(&mut self, hash: Hash, info: &ComputePipelineCreateInfo) {
        if !self.reachable.insert(ResourceKind::ComputePipeline, hash) {
            return;
        }

        self.mark_pipeline_layout(info.layout);
        self.mark_leaf(ResourceKind::ShaderModule, info.stage.module);
    }
}

impl StateCreator for PruneReplayer {
    fn set_session_info(
        &mut self,
        app: Option<&ApplicationInfo>,
        features: Option<&DeviceFeatures>,
    ) {
        if !self.allow_session_info {
            return;
        }

        match ApplicationInfo::feature_hash(app, features) {
            Ok(hash) => {
                info!("Available application feature hash: {}", hash);
                self.feature_hash = Some(hash);
            }
            Err(e) => warn!("Failed to hash application info: {}", e),
        }

        if let Some(app) = app {
            info!(
                engine_name = app.engine_name.as_deref().unwrap_or("N/A"),
                application_name = app.application_name.as_deref().unwrap_or("N/A"),
                engine_version = app.engine_version,
                application_version = app.application_version,
                "applicationInfo"
            );
        }
    }

    fn set_current_session(&mut self, hash: Hash) {
        self.current_session = hash;
    }

    fn create_sampler(&mut self, hash: Hash, _info: &SamplerCreateInfo) -> Result<Hash> {
        self.candidates.insert(ResourceKind::Sampler, hash);
        Ok(hash)
    }

    fn create_descriptor_set_layout(
        &mut self,
        hash: Hash,
        info: &DescriptorSetLayoutCreateInfo,
    ) -> Result<Hash> {
        self.candidates
            .insert(ResourceKind::DescriptorSetLayout, hash);
        self.set_layouts.insert(hash, info.clone());
        Ok(hash)
    }

    fn create_pipeline_layout(
        &mut self,
        hash: Hash,
        info: &PipelineLayoutCreateInfo,
    ) -> Result<Hash> {
        self.candidates.insert(ResourceKind::PipelineLayout, hash);
        self.pipeline_layouts.insert(hash, info.clone());
        Ok(hash)
    }

    fn create_shader_module(&mut self, hash: Hash, _info: &ShaderModuleCreateInfo) -> Result<Hash> {
        self.candidates.insert(ResourceKind::ShaderModule, hash);
        Ok(hash)
    }

    fn create_render_pass(&mut self, hash: Hash, _info: &RenderPassCreateInfo) -> Result<Hash> {
        self.candidates.insert(ResourceKind::RenderPass, hash);
        Ok(hash)
    }

    fn create_graphics_pipeline(
        &mut self,
        hash: Hash,
        info: &GraphicsPipelineCreateInfo,
    ) -> Result<Hash> {
        self.candidates.insert(ResourceKind::GraphicsPipeline, hash);
        if self.is_root_session() {
            self.mark_graphics_pipeline(hash, info);
        }
        Ok(hash)
    }

    fn create_compute_pipeline(
        &mut self,
        hash: Hash,
        info: &ComputePipelineCreateInfo,
    ) -> Result<Hash> {
        self.candidates.insert(ResourceKind::ComputePipeline, hash);
        if self.is_root_session() {
            self.mark_compute_pipeline(hash, info);
        }
        Ok(hash)
    }
}
