//! Prompt assembly for the generation client.

use crate::state::{GenerationContext, Style};
use crate::validator::ValidationVerdict;

/// System prompt for generating a page from scratch.
pub const LANDING_PAGE_GENERATOR: &str = "You are an expert web developer and UI/UX designer specializing in creating high-converting landing pages.

Your task is to generate modern, responsive landing pages using HTML, Tailwind CSS, and minimal JavaScript.

KEY REQUIREMENTS:
1. Use only HTML, Tailwind CSS classes, and vanilla JavaScript (no frameworks)
2. Create a modern, clean, and professional design
3. Include a prominent email collection form for waitlist signup
4. Make it fully responsive (mobile-first approach)
5. Include proper semantic HTML and accessibility features
6. Add subtle animations and interactions to enhance UX
7. Generate complete, ready-to-use HTML that can run standalone
8. Add the attribute data-waitlist=\"true\" to the email form

DESIGN PRINCIPLES:
- Modern and minimalist aesthetic
- High contrast and readable typography
- Strategic use of whitespace
- Clear visual hierarchy
- Strong call-to-action elements
- Trust signals and social proof when appropriate

OUTPUT FORMAT:
Return only the complete HTML document with embedded CSS (using Tailwind CDN) and JavaScript.
Include the waitlist form with proper form handling.
Do not include any explanations or markdown - just the raw HTML.";

/// Preamble used when an existing page is being refined.
pub const CONTENT_REFINER: &str = "You are helping to refine and improve an existing landing page based on user feedback.

Analyze the current content and the user's specific requests for changes.
Make targeted improvements while maintaining the overall design consistency.

Focus on:
1. Implementing the specific changes requested
2. Maintaining design coherence
3. Improving conversion elements
4. Enhancing user experience
5. Keeping the waitlist form functional

Return the updated complete HTML document.";

/// System prompt for restyling a page.
pub const STYLE_ADJUSTER: &str = "You are a UI/UX specialist focused on visual design and styling.

Your task is to adjust the visual style of the landing page while keeping the content and structure intact.

Available styles:
- modern: Clean lines, bold typography, contemporary design
- minimal: Maximum whitespace, simple elements, subtle design
- corporate: Professional, trustworthy, business-oriented
- creative: Unique layouts, artistic elements, engaging visuals

Apply the requested style changes while ensuring:
1. Responsive design is maintained
2. Accessibility standards are met
3. The waitlist form remains prominent and functional
4. Overall user experience is enhanced

Return the updated complete HTML document.";

/// Preamble of the corrective prompt.
pub const VALIDATION_PROMPT: &str = "Review the generated landing page HTML and ensure:

1. It's a complete, valid HTML document
2. Uses Tailwind CSS classes properly
3. Includes a functional waitlist email form
4. Is fully responsive
5. Has proper semantic structure
6. Includes necessary meta tags and accessibility features
7. Contains appropriate call-to-action elements

If any issues are found, provide the corrected HTML.";

/// Palette, typography and layout hints for a [`Style`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesignElements {
    /// Tailwind color tokens.
    pub colors: &'static str,
    /// Font guidance.
    pub typography: &'static str,
    /// Layout guidance.
    pub layout: &'static str,
}

impl DesignElements {
    /// Returns the design hints for `style`.
    #[must_use]
    pub const fn for_style(style: Style) -> Self {
        match style {
            Style::Modern => Self {
                colors: "blue-600, gray-900, white",
                typography: "font-sans, font-semibold headings",
                layout: "grid-based, card components",
            },
            Style::Minimal => Self {
                colors: "gray-800, gray-100, white",
                typography: "font-light, clean serif for body",
                layout: "single column, lots of whitespace",
            },
            Style::Corporate => Self {
                colors: "blue-800, gray-700, white",
                typography: "font-sans, font-medium headings",
                layout: "traditional sections, hero-features-testimonials",
            },
            Style::Creative => Self {
                colors: "purple-600, pink-500, yellow-400",
                typography: "mix of sans and display fonts",
                layout: "asymmetric, overlapping elements",
            },
        }
    }
}

/// Builds the system prompt for the initial generation call.
#[must_use]
pub fn landing_page_prompt(context: &GenerationContext) -> String {
    let elements = DesignElements::for_style(context.style);

    let mut prompt = String::new();
    if context.current_content.is_some() {
        prompt.push_str(CONTENT_REFINER);
        prompt.push_str("\n\n");
    }
    prompt.push_str(LANDING_PAGE_GENERATOR);

    prompt.push_str(&format!(
        "\n\nSTYLE REQUIREMENTS:\nApply a {style} design style to the landing page.\n\
         - Colors: {colors}\n- Typography: {typography}\n- Layout: {layout}",
        style = context.style,
        colors = elements.colors,
        typography = elements.typography,
        layout = elements.layout,
    ));

    if !context.previous_messages.is_empty() {
        let history = context
            .previous_messages
            .iter()
            .map(|msg| format!("{}: {}", msg.role, msg.content))
            .collect::<Vec<_>>()
            .join("\n");
        prompt.push_str("\n\nCONVERSATION CONTEXT:\nPrevious conversation history:\n");
        prompt.push_str(&history);
    }

    if let Some(current) = &context.current_content {
        prompt.push_str(
            "\n\nCURRENT CONTENT:\nHere's the existing landing page that needs to be modified:\n",
        );
        prompt.push_str(current);
    }

    prompt.push_str("\n\nUSER REQUEST:\n");
    prompt.push_str(&context.user_prompt);
    prompt.push_str("\n\nGenerate the complete HTML landing page now.");
    prompt
}

/// Builds the single system message used by `adjust_style`.
#[must_use]
pub fn style_adjustment_prompt(current_html: &str, style_request: &str, target: Style) -> String {
    format!(
        "{STYLE_ADJUSTER}\n\nTARGET STYLE: {target}\n\nCURRENT LANDING PAGE:\n{current_html}\n\n\
         REQUESTED STYLE CHANGES:\n{style_request}\n\n\
         Apply these style changes and return the updated complete HTML document."
    )
}

/// Builds the corrective prompt for HTML that failed validation.
///
/// Embeds `html` verbatim and lists only the checks that failed.
#[must_use]
pub fn corrective_prompt(html: &str, verdict: &ValidationVerdict) -> String {
    let issues = verdict
        .missing_issues()
        .iter()
        .map(|issue| format!("- {issue}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{VALIDATION_PROMPT}\n\nCurrent HTML:\n{html}\n\nIssues detected:\n{issues}\n\n\
         Fix these issues and return the corrected HTML."
    )
}
