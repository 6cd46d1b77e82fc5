//! Crew 定义加载与内置 crew

pub mod definition;
pub mod presets;

pub use definition::{
    AgentDefinition, CrewDefinition, CrewMeta, CrewSettings, DefinitionError, TaskDefinition,
};
pub use presets::{
    build_crew, load_definition, research_inputs, run_crew, weekend_inputs, CrewKind,
    ResearchRequest, WeekendRequest,
};
