pub const DEFAULT_RESPONSE_LANGUAGE: &str = "Chinese";

const DETAILED_SYSTEM_PROMPT: &str = r#"You are an expert in vision-and-language navigation (VLN).
You analyze natural-language navigation instructions that an embodied agent must follow
inside indoor 3D environments, and you give precise, well-structured assessments."#;

const DETAILED_USER_PROMPT: &str = r#"Analyze the following vision-and-language navigation (VLN) instruction in detail:

Navigation instruction: "{instruction}"

Cover the following aspects:
1. **Task type**: what kind of navigation task is this? (e.g. goal navigation, room transition, object search)
2. **Key landmarks**: which important landmarks or objects does the instruction mention?
3. **Action sequence**: which main actions must be performed? (e.g. move forward, turn, enter a room)
4. **Spatial relations**: which spatial relations are described? (e.g. left, right, in front of, behind)
5. **Difficulty**: how complex is this instruction? (easy/medium/hard)
6. **Potential challenges**: what difficulties could an agent face when following it?

Answer in {language} with a clear structure."#;

const BRIEF_SYSTEM_PROMPT: &str = r#"You are a professional vision-and-language navigation (VLN) task analyst.
Given a navigation instruction, provide a concise but expert analysis."#;

const BRIEF_USER_PROMPT: &str = r#"Analyze the following navigation instruction:

Instruction: {instruction}

Briefly describe:
1. The task goal
2. The key landmarks
3. The actions to perform

Answer in {language}."#;

/// System framing and user prompt used for one analysis request.
///
/// `{instruction}` and `{language}` placeholders in `user` are substituted by
/// [`PromptTemplate::render`].
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    pub system: String,
    pub user: String,
    pub language: String,
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            language: DEFAULT_RESPONSE_LANGUAGE.to_string(),
        }
    }

    /// Six-aspect analysis used for batch runs.
    pub fn detailed() -> Self {
        Self::new(DETAILED_SYSTEM_PROMPT, DETAILED_USER_PROMPT)
    }

    /// Three-point summary used when inspecting a single episode.
    pub fn brief() -> Self {
        Self::new(BRIEF_SYSTEM_PROMPT, BRIEF_USER_PROMPT)
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn render(&self, instruction: &str) -> String {
        // Language first so an instruction containing "{language}" is left intact.
        self.user
            .replace("{language}", &self.language)
            .replace("{instruction}", instruction)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::detailed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_detailed() {
        let prompt = PromptTemplate::detailed().render("Go to the kitchen");
        assert!(prompt.contains("\"Go to the kitchen\""));
        assert!(prompt.contains("Spatial relations"));
        assert!(prompt.contains("Potential challenges"));
        assert!(prompt.contains("Answer in Chinese"));
        assert!(!prompt.contains("{instruction}"));
    }

    #[test]
    fn test_render_brief() {
        let template = PromptTemplate::brief();
        assert_ne!(template.system, PromptTemplate::detailed().system);

        let prompt = template.render("Exit the bedroom and stop at the stairs");
        assert!(prompt.contains("Instruction: Exit the bedroom and stop at the stairs"));
        assert!(prompt.contains("1. The task goal"));
        assert!(prompt.contains("2. The key landmarks"));
        assert!(prompt.contains("3. The actions to perform"));
        assert!(prompt.contains("Answer in Chinese."));
        assert!(!prompt.contains("Spatial relations"));
        assert!(!prompt.contains("{language}"));
    }

    #[test]
    fn test_render_custom_language_and_template() {
        let template = PromptTemplate::new("sys", "<{instruction}> ({language})").with_language("English");
        assert_eq!(template.render("walk {language}"), "<walk {language}> (English)");
    }
}
