/// Turns captured diagnostics into something a chat platform can display.
pub trait DiagnosticsRenderer: Send + Sync {
    fn render(&self, text: &str) -> anyhow::Result<String>;
}

/// Fenced code block, the lowest common denominator across platforms.
pub struct PreformattedRenderer {
    language: String,
    max_chars: usize,
}

impl PreformattedRenderer {
    pub fn new(language: impl Into<String>, max_chars: usize) -> Self {
        Self {
            language: language.into(),
            max_chars,
        }
    }
}

impl Default for PreformattedRenderer {
    fn default() -> Self {
        Self::new("shell", 3500)
    }
}

impl DiagnosticsRenderer for PreformattedRenderer {
    fn render(&self, text: &str) -> anyhow::Result<String> {
        // Keep the tail: the last lines before exit matter most.
        let char_count = text.chars().count();
        let body = if char_count > self.max_chars {
            let skip = char_count - self.max_chars;
            let tail: String = text.chars().skip(skip).collect();
            format!("...\n{tail}")
        } else {
            text.to_string()
        };
        let fence = if body.contains("```") { "~~~" } else { "```" };
        Ok(format!("\n{fence}{}\n{body}\n{fence}", self.language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_in_fenced_block() {
        let out = PreformattedRenderer::default().render("$ git pull\nok").unwrap();
        assert_eq!(out, "\n```shell\n$ git pull\nok\n```");
    }

    #[test]
    fn keeps_tail_of_long_text() {
        let out = PreformattedRenderer::new("", 3).render("abcdef").unwrap();
        assert!(out.contains("...\ndef"));
        assert!(!out.contains("abc"));
    }

    #[test]
    fn switches_fence_when_text_contains_backticks() {
        let out = PreformattedRenderer::default().render("```nested```").unwrap();
        assert!(out.starts_with("\n~~~shell"));
    }
}
