//! Built-in prompt templates.
//!
//! Handlebars syntax. Each template documents the substitution keys it
//! requires; the composer registers them in strict mode, so a missing key is
//! a hard error rather than a silently blank section.

/// Classification prompt. Keys: content, query.
pub const CLASSIFIER: &str = r#"You are an educational content analyst. Analyze the source content
and the user's request, then respond with a single JSON object and nothing else.

Source content:
{{content}}

User request:
{{query}}

Respond with JSON of this exact shape:
{
  "curriculum": "math" | "chemistry" | "physics" | "unknown",
  "intention": "static" | "dynamic" | "improvement",
  "concepts": ["2 to 5 key concepts, most important first"],
  "summary": "one or two sentences describing what to visualize"
}

Rules:
- "dynamic" when the user asks for an animation, motion, or a step-by-step
  walkthrough; "static" for a single diagram or figure.
- "improvement" only when the user asks to change existing code.
- When the signal is ambiguous, prefer "static" and "unknown".
"#;

/// Static diagram generation. Keys: curriculum, concepts, summary, content, query.
pub const STATIC: &str = r#"You are an expert Manim programmer creating educational visualizations.

Curriculum area: {{curriculum}}
Key concepts: {{concepts}}
Analysis: {{summary}}

Source content:
{{content}}

User request:
{{query}}

Write a complete Manim script that renders a single static diagram
illustrating the concepts above. Requirements:
- Exactly one class deriving from Scene, with a construct method.
- Use self.add for static placement; avoid animations.
- Label every element; keep text readable at 480p.
- Start the file with `from manim import *`.

Return only one fenced python code block.
"#;

/// Animated explanation generation. Keys: curriculum, concepts, summary, content, query.
pub const DYNAMIC: &str = r#"You are an expert Manim programmer creating educational animations.

Curriculum area: {{curriculum}}
Key concepts: {{concepts}}
Analysis: {{summary}}

Source content:
{{content}}

User request:
{{query}}

Write a complete Manim script that animates a step-by-step explanation of
the concepts above. Requirements:
- Exactly one class deriving from Scene, with a construct method.
- Use self.play with explicit run_time; total duration under 60 seconds.
- Introduce one idea per step, with a short wait between steps.
- Start the file with `from manim import *`.

Return only one fenced python code block.
"#;

/// Improvement of an existing script. Keys: curriculum, concepts,
/// prior_script, prior_diagnostics, query.
pub const IMPROVEMENT: &str = r#"You are an expert Manim programmer improving an existing scene.

Curriculum area: {{curriculum}}
Key concepts: {{concepts}}

Current script:
```python
{{prior_script}}
```
{{#if prior_diagnostics}}
Known issues from the last run:
{{prior_diagnostics}}
{{/if}}
User request:
{{query}}

Rewrite the script applying the requested improvements while preserving its
intent. Keep exactly one class deriving from Scene. Return only one fenced
python code block containing the full revised script.
"#;

/// Repair of a failing script. Keys: concepts, script, diagnostic, query.
pub const REPAIR: &str = r#"You are an expert Manim programmer fixing a script that failed to run.

The script below was generated to illustrate: {{concepts}}

Failing script:
```python
{{script}}
```

Error output:
{{diagnostic}}

User request:
{{query}}

Fix the error and return the complete corrected script. Keep exactly one
class deriving from Scene. Do not change what the scene illustrates. Return
only one fenced python code block.
"#;
