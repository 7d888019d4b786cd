//! # Prompts
//!
//! The research task given to the tool-using agent, and the grading prompt
//! given to the reviewer.

use crate::workflow::Evaluation;

/// System prompt for the tool-using research agent.
pub const RESEARCHER_PREAMBLE: &str = r#"
You are a meticulous company research analyst preparing material for a sales team.

You have tools to scrape the company website and to search for news, financial
data and competitors. Call each tool at most a couple of times, then write the
deliverables. Tool results that start with "Error" mean the lookup failed: say
so in the report instead of inventing data. Always cite the links you used.
"#;

/// System prompt for the reviewer. It must answer with one JSON object.
pub const REVIEWER_PREAMBLE: &str = r#"
You are an analyst grading company research reports.
Respond with a single JSON object and nothing else, in exactly this shape:
{"score": <integer 0-100>, "rewrite": <true|false>, "evaluation": "<detailed rationale>"}
"#;

/// Build the research task for one company.
///
/// `feedback` is the previous review, if this is a rewrite pass.
pub fn research_task(
    company_name: &str,
    company_website: &str,
    industry: &str,
    feedback: Option<&Evaluation>,
) -> String {
    let feedback = match feedback {
        Some(eval) => format!(
            "score {}/100, rewrite requested: {}. {}",
            eval.score, eval.rewrite, eval.evaluation
        ),
        None => "None".to_string(),
    };

    format!(
        r#"
I need you to research the company {company_name} with website {company_website} operating in the {industry} sector.

Please use the available tools to conduct thorough research:

**Data Collection Phase:**
1. **Website Analysis**: Scrape the company website to extract:
   - Company overview, mission, and values
   - Products/services offered
   - Target markets and customer segments
   - Leadership team and key personnel
   - Recent announcements or press releases
   - Contact information and office locations

2. **News & Market Intelligence**: Search for recent information about:
   - Latest company news and developments (past 6-12 months)
   - Industry trends affecting the company
   - Partnership announcements or strategic initiatives
   - Product launches or service expansions
   - Leadership changes or organizational updates
   - Always provide links

3. **Financial & Performance Research**: Look for:
   - Revenue figures and growth metrics
   - Funding rounds or investment news
   - Market position and company size indicators
   - Performance compared to industry benchmarks
   - Always provide links

4. **Competitive Intelligence**: Research:
   - Main competitors in their space
   - Market positioning relative to competitors
   - Unique value propositions or differentiators
   - Always provide links

**Deliverables:**

Create two comprehensive documents:

**1. EXECUTIVE FACT SHEET (Sales Rep Quick Reference)**
Format this as a concise, scannable document including:
- Company snapshot (size, revenue, locations)
- Key decision makers and contacts
- Primary products/services with brief descriptions
- Target customer profile
- Recent significant developments
- Competitive positioning
- Potential pain points or challenges
- Conversation starters and discovery questions

**2. DETAILED RESEARCH REPORT (800-1200 words)**
Structure as follows:

- **Executive Summary** (key findings for quick scanning)
- **Company Profile** (comprehensive overview)
- **Business Model & Offerings** (detailed product/service analysis)
- **Financial Health & Performance**
  - Summarize each source with direct links
  - Include growth indicators and market position
- **Recent Developments & News**
  - Brief summary of each relevant article
  - Direct links to all news sources
- **Competitive Landscape** (market positioning analysis)
- **Sales Intelligence & Insights**
  - Potential business challenges
  - Growth opportunities
  - Recommended talking points
- **Discovery Call Preparation**
  - Suggested questions based on research
  - Potential value propositions to explore
  - Risk factors or objections to anticipate

**Research Quality Standards:**
- Prioritize recent information (within 12 months)
- Cross-reference multiple sources for accuracy
- Focus on actionable intelligence for sales conversations
- Include direct links to all sources for verification
- Highlight any data limitations or gaps found

Please gather comprehensive data using all available tools before creating the final deliverables. The fact sheet should be immediately actionable for a sales rep reviewing it 10 minutes before a discovery call.

Evaluation feedback if any: {feedback}
"#
    )
}

/// Build the grading prompt for a finished report.
pub fn review_task(report: &str) -> String {
    format!(
        r#"
Grade the following company report on a scale of 0-100 based on:
- Completeness
- Clarity
- Factual Accuracy
- Usefulness to an investor or a sales rep preparing for a call

Set "rewrite" to true only if the report falls short enough that another
research pass would clearly improve it.

Report:
{report}

Give detailed scores per criterion in the evaluation text and an overall score.
"#
    )
}
