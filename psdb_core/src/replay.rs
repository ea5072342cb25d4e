//! Record decoding into creation events.
//!
//! [`StateReplayer`] parses a decoded payload and drives a [`StateCreator`]
//! with one event per object, in dependency order within the record. No real
//! objects are ever built; creators hand back a handle per object and the
//! replayer substitutes those handles into later references.

use crate::error::Result;
use crate::hash::Hash;
use crate::kind::ResourceKind;
use crate::state::{
    ApplicationInfo, ComputePipelineCreateInfo, DescriptorSetLayoutCreateInfo, DeviceFeatures,
    GraphicsPipelineCreateInfo, PipelineLayoutCreateInfo, RenderPassCreateInfo,
    SamplerCreateInfo, ShaderModuleCreateInfo, StateDocument,
};
use std::collections::HashMap;

/// Receiver of creation events.
///
/// Every `create_*` method returns the handle standing in for the created
/// object. An error aborts the parse of the current record.
pub trait StateCreator {
    /// Application info and device features of a session record.
    fn set_session_info(
        &mut self,
        _app: Option<&ApplicationInfo>,
        _features: Option<&DeviceFeatures>,
    ) {
    }

    /// The session subsequent events belong to.
    fn set_current_session(&mut self, _hash: Hash) {}

    fn create_sampler(&mut self, hash: Hash, info: &SamplerCreateInfo) -> Result<Hash>;

    fn create_descriptor_set_layout(
        &mut self,
        hash: Hash,
        info: &DescriptorSetLayoutCreateInfo,
    ) -> Result<Hash>;

    fn create_pipeline_layout(&mut self, hash: Hash, info: &PipelineLayoutCreateInfo)
    -> Result<Hash>;

    fn create_shader_module(&mut self, hash: Hash, info: &ShaderModuleCreateInfo) -> Result<Hash>;

    fn create_render_pass(&mut self, hash: Hash, info: &RenderPassCreateInfo) -> Result<Hash>;

    fn create_graphics_pipeline(
        &mut self,
        hash: Hash,
        info: &GraphicsPipelineCreateInfo,
    ) -> Result<Hash>;

    fn create_compute_pipeline(
        &mut self,
        hash: Hash,
        info: &ComputePipelineCreateInfo,
    ) -> Result<Hash>;
}

/// Decoder of state documents.
#[derive(Debug)]
pub struct StateReplayer {
    handles: HashMap<(ResourceKind, Hash), Hash>,
    resolve_shader_module_handles: bool,
}

impl Default for StateReplayer {
    fn default() -> Self {
        Self::new()
    }
}

impl StateReplayer {
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
            resolve_shader_module_handles: true,
        }
    }

    /// Whether shader stage modules are translated through created handles.
    ///
    /// When disabled, stages keep the module hash as-is, so pipelines can be
    /// decoded without ever decoding their shader modules.
    pub fn set_resolve_shader_module_handles(&mut self, enable: bool) {
        self.resolve_shader_module_handles = enable;
    }

    /// Handle a reference resolves to. Unknown references stay as the hash.
    fn resolve(&self, kind: ResourceKind, hash: Hash) -> Hash {
        if hash.is_null() {
            return hash;
        }
        self.handles.get(&(kind, hash)).copied().unwrap_or(hash)
    }

    fn resolve_module(&self, hash: Hash) -> Hash {
        if self.resolve_shader_module_handles {
            self.resolve(ResourceKind::ShaderModule, hash)
        } else {
            hash
        }
    }

    /// Decode one payload, emitting its creation events into `creator`.
    pub fn parse(&mut self, creator: &mut dyn StateCreator, bytes: &[u8]) -> Result<()> {
        let document = StateDocument::from_json_bytes(bytes)?;

        if let Some(session) = document.session {
            creator.set_current_session(session);
        }

        if document.application.is_some() || document.physical_device_features.is_some() {
            creator.set_session_info(
                document.application.as_ref(),
                document.physical_device_features.as_ref(),
            );
        }

        for (hash, info) in &document.samplers {
            let handle = creator.create_sampler(*hash, info)?;
            self.handles.insert((ResourceKind::Sampler, *hash), handle);
        }

        for (hash, mut info) in document.set_layouts {
            for binding in &mut info.bindings {
                for sampler in &mut binding.immutable_samplers {
                    *sampler = self.resolve(ResourceKind::Sampler, *sampler);
                }
            }
            let handle = creator.create_descriptor_set_layout(hash, &info)?;
            self.handles
                .insert((ResourceKind::DescriptorSetLayout, hash), handle);
        }

        for (hash, mut info) in document.pipeline_layouts {
            for set_layout in &mut info.set_layouts {
                *set_layout = self.resolve(ResourceKind::DescriptorSetLayout, *set_layout);
            }
            let handle = creator.create_pipeline_layout(hash, &info)?;
            self.handles
                .insert((ResourceKind::PipelineLayout, hash), handle);
        }

        for (hash, info) in &document.shader_modules {
            let handle = creator.create_shader_module(*hash, info)?;
            self.handles
                .insert((ResourceKind::ShaderModule, *hash), handle);
        }

        for (hash, info) in &document.render_passes {
            let handle = creator.create_render_pass(*hash, info)?;
            self.handles.insert((ResourceKind::RenderPass, *hash), handle);
        }

        for (hash, mut info) in document.graphics_pipelines {
            info.layout = self.resolve(ResourceKind::PipelineLayout, info.layout);
            info.render_pass = self.resolve(ResourceKind::RenderPass, info.render_pass);
            for stage in &mut info.stages {
                stage.module = self.resolve_module(stage.module);
            }
            let handle = creator.create_graphics_pipeline(hash, &info)?;
            self.handles
                .insert((ResourceKind::GraphicsPipeline, hash), handle);
        }

        for (hash, mut info) in document.compute_pipelines {
            info.layout = self.resolve(ResourceKind::PipelineLayout, info.layout);
            info.stage.module = self.resolve_module(info.stage.module);
            let handle = creator.create_compute_pipeline(hash, &info)?;
            self.handles
                .insert((ResourceKind::ComputePipeline, hash), handle);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::state::PipelineShaderStage;

    /// Records events in order and hands out offset handles.
    #[derive(Default)]
    struct EventLog {
        events: Vec<String>,
        handle_offset: u64,
        last_layout: Option<PipelineLayoutCreateInfo>,
        last_graphics: Option<GraphicsPipelineCreateInfo>,
        fail_on_render_pass: bool,
    }

    impl EventLog {
        fn handle(&self, hash: Hash) -> Result<Hash> {
            Ok(Hash::new(hash.as_u64() + self.handle_offset))
        }
    }

    impl StateCreator for EventLog {
        fn set_session_info(
            &mut self,
            app: Option<&ApplicationInfo>,
            _features: Option<&DeviceFeatures>,
        ) {
            let name = app.and_then(|a| a.application_name.clone());
            self.events.push(format!("info:{}", name.unwrap_or_default()));
        }

        fn set_current_session(&mut self, hash: Hash) {
            self.events.push(format!("session:{}", hash));
        }

        fn create_sampler(&mut self, hash: Hash, _: &SamplerCreateInfo) -> Result<Hash> {
            self.events.push(format!("sampler:{}", hash));
            self.handle(hash)
        }

        fn create_descriptor_set_layout(
            &mut self,
            hash: Hash,
            _: &DescriptorSetLayoutCreateInfo,
        ) -> Result<Hash> {
            self.events.push(format!("set_layout:{}", hash));
            self.handle(hash)
        }

        fn create_pipeline_layout(
            &mut self,
            hash: Hash,
            info: &PipelineLayoutCreateInfo,
        ) -> Result<Hash> {
            self.events.push(format!("pipeline_layout:{}", hash));
            self.last_layout = Some(info.clone());
            self.handle(hash)
        }

        fn create_shader_module(&mut self, hash: Hash, _: &ShaderModuleCreateInfo) -> Result<Hash> {
            self.events.push(format!("shader_module:{}", hash));
            self.handle(hash)
        }

        fn create_render_pass(&mut self, hash: Hash, _: &RenderPassCreateInfo) -> Result<Hash> {
            if self.fail_on_render_pass {
                return Err(Error::decode("render pass rejected"));
            }
            self.events.push(format!("render_pass:{}", hash));
            self.handle(hash)
        }

        fn create_graphics_pipeline(
            &mut self,
            hash: Hash,
            info: &GraphicsPipelineCreateInfo,
        ) -> Result<Hash> {
            self.events.push(format!("graphics:{}", hash));
            self.last_graphics = Some(info.clone());
            self.handle(hash)
        }

        fn create_compute_pipeline(
            &mut self,
            hash: Hash,
            _: &ComputePipelineCreateInfo,
        ) -> Result<Hash> {
            self.events.push(format!("compute:{}", hash));
            self.handle(hash)
        }
    }

    fn h(value: u64) -> Hash {
        Hash::new(value)
    }

    fn full_document() -> StateDocument {
        StateDocument::new()
            .with_session(h(0xa1))
            .with_compute_pipeline(
                h(0xc0),
                ComputePipelineCreateInfo {
                    layout: h(0x10),
                    stage: PipelineShaderStage {
                        module: h(0x40),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            )
            .with_graphics_pipeline(
                h(0xb0),
                GraphicsPipelineCreateInfo {
                    layout: h(0x10),
                    render_pass: h(0x30),
                    stages: vec![PipelineShaderStage {
                        module: h(0x40),
                        ..Default::default()
                    }],
                    ..Default::default()
                },
            )
            .with_render_pass(h(0x30), RenderPassCreateInfo::default())
            .with_shader_module(h(0x40), ShaderModuleCreateInfo::default())
            .with_pipeline_layout(
                h(0x10),
                PipelineLayoutCreateInfo {
                    set_layouts: vec![h(0x20), h(0x99)],
                    ..Default::default()
                },
            )
            .with_set_layout(h(0x20), DescriptorSetLayoutCreateInfo::default())
            .with_sampler(h(0x01), SamplerCreateInfo::default())
    }

    #[test]
    fn test_events_in_dependency_order() {
        let bytes = full_document().to_json_bytes().unwrap();
        let mut log = EventLog::default();

        StateReplayer::new().parse(&mut log, &bytes).unwrap();

        assert_eq!(
            log.events,
            vec![
                "session:00000000000000a1",
                "sampler:0000000000000001",
                "set_layout:0000000000000020",
                "pipeline_layout:0000000000000010",
                "shader_module:0000000000000040",
                "render_pass:0000000000000030",
                "graphics:00000000000000b0",
                "compute:00000000000000c0",
            ]
        );
    }

    #[test]
    fn test_session_info_event() {
        let document = StateDocument::new().with_application(
            ApplicationInfo {
                application_name: Some("demo".to_string()),
                ..Default::default()
            },
            DeviceFeatures::new(),
        );
        let mut log = EventLog::default();

        StateReplayer::new()
            .parse(&mut log, &document.to_json_bytes().unwrap())
            .unwrap();

        assert_eq!(log.events, vec!["info:demo"]);
    }

    #[test]
    fn test_references_translated_through_handles() {
        let bytes = full_document().to_json_bytes().unwrap();
        let mut log = EventLog {
            handle_offset: 0x1000,
            ..Default::default()
        };

        StateReplayer::new().parse(&mut log, &bytes).unwrap();

        // Known set layout translated, unknown one passed through
        let layout = log.last_layout.unwrap();
        assert_eq!(layout.set_layouts, vec![h(0x1020), h(0x99)]);

        let graphics = log.last_graphics.unwrap();
        assert_eq!(graphics.layout, h(0x1010));
        assert_eq!(graphics.render_pass, h(0x1030));
        assert_eq!(graphics.stages[0].module, h(0x1040));
    }

    #[test]
    fn test_shader_modules_unresolved_when_disabled() {
        let bytes = full_document().to_json_bytes().unwrap();
        let mut log = EventLog {
            handle_offset: 0x1000,
            ..Default::default()
        };
        let mut replayer = StateReplayer::new();
        replayer.set_resolve_shader_module_handles(false);

        replayer.parse(&mut log, &bytes).unwrap();

        let graphics = log.last_graphics.unwrap();
        assert_eq!(graphics.stages[0].module, h(0x40));
        assert_eq!(graphics.layout, h(0x1010));
    }

    #[test]
    fn test_handles_persist_across_records() {
        let mut replayer = StateReplayer::new();
        let mut log = EventLog {
            handle_offset: 0x1000,
            ..Default::default()
        };

        let layouts = StateDocument::new()
            .with_pipeline_layout(h(0x10), PipelineLayoutCreateInfo::default());
        replayer
            .parse(&mut log, &layouts.to_json_bytes().unwrap())
            .unwrap();

        let pipelines = StateDocument::new().with_graphics_pipeline(
            h(0xb0),
            GraphicsPipelineCreateInfo {
                layout: h(0x10),
                ..Default::default()
            },
        );
        replayer
            .parse(&mut log, &pipelines.to_json_bytes().unwrap())
            .unwrap();

        let graphics = log.last_graphics.unwrap();
        assert_eq!(graphics.layout, h(0x1010));
        assert!(graphics.render_pass.is_null());
    }

    #[test]
    fn test_creator_error_aborts_parse() {
        let bytes = full_document().to_json_bytes().unwrap();
        let mut log = EventLog {
            fail_on_render_pass: true,
            ..Default::default()
        };

        let result = StateReplayer::new().parse(&mut log, &bytes);
        assert!(result.is_err());
        assert!(!log.events.iter().any(|e| e.starts_with("graphics")));
    }

    #[test]
    fn test_malformed_payload() {
        let mut log = EventLog::default();
        assert!(StateReplayer::new().parse(&mut log, b"garbage").is_err());
        assert!(log.events.is_empty());
    }
}
