/// One step of the content pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDef {
    /// Agent the stage dispatches to.
    pub agent: &'static str,
    pub task_type: &'static str,
    /// Task description prefix; `None` uses the bare topic.
    pub description: Option<&'static str>,
    /// Key the stage's output is stored under for later stages.
    pub output_key: &'static str,
    /// Earlier outputs merged into this stage's task metadata.
    pub inputs: &'static [&'static str],
}

impl StageDef {
    pub fn task_description(&self, topic: &str) -> String {
        match self.description {
            Some(prefix) => format!("{prefix}: {topic}"),
            None => topic.to_string(),
        }
    }
}

pub const STAGES: [StageDef; 7] = [
    StageDef {
        agent: "research",
        task_type: "research",
        description: None,
        output_key: "research",
        inputs: &[],
    },
    StageDef {
        agent: "writer",
        task_type: "write",
        description: Some("Write content about"),
        output_key: "draft",
        inputs: &["research"],
    },
    StageDef {
        agent: "editor",
        task_type: "edit",
        description: Some("Edit content about"),
        output_key: "edited",
        inputs: &["draft"],
    },
    StageDef {
        agent: "seo",
        task_type: "optimize",
        description: Some("Optimize SEO for"),
        output_key: "seo",
        inputs: &["edited"],
    },
    StageDef {
        agent: "quality_reviewer",
        task_type: "quality",
        description: Some("Review quality for"),
        output_key: "quality",
        inputs: &["seo"],
    },
    StageDef {
        agent: "image_prompt",
        task_type: "image_prompt",
        description: Some("Generate image prompts for"),
        output_key: "image_prompts",
        inputs: &["quality"],
    },
    StageDef {
        agent: "visual_suggestion",
        task_type: "visual",
        description: Some("Generate visual suggestions for"),
        output_key: "visual",
        inputs: &["quality", "image_prompts"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_input_is_produced_by_an_earlier_stage() {
        for (i, stage) in STAGES.iter().enumerate() {
            for input in stage.inputs {
                assert!(
                    STAGES[..i].iter().any(|s| s.output_key == *input),
                    "{} reads '{}' before it exists",
                    stage.agent,
                    input
                );
            }
        }
    }

    #[test]
    fn test_task_description() {
        assert_eq!(STAGES[0].task_description("Moon"), "Moon");
        assert_eq!(STAGES[1].task_description("Moon"), "Write content about: Moon");
    }
}
