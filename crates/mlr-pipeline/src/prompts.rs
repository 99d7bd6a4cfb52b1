//! Prompt templates and agent instructions for every stage and evaluator.

use mlr_core::{ExperimentResult, LiteratureReview, ResearchIdea, ResearchPaper, ResearchProposal, Task};

pub const IDEA_INSTRUCTION: &str = "You are a creative AI research scientist. \
Generate novel, feasible, and impactful research ideas. \
Be specific about methodology and expected outcomes.";

pub const LITERATURE_INSTRUCTION: &str = "You are an expert research assistant. \
Conduct thorough literature reviews to identify key findings, \
research gaps, and situate new ideas in existing work.";

pub const PROPOSAL_INSTRUCTION: &str = "You are an experienced research scientist. \
Write clear, detailed, and rigorous research proposals \
suitable for top-tier ML conferences.";

pub const EXPERIMENT_INSTRUCTION: &str = "You are an expert ML engineer. \
Generate clean, modular, well-documented Python code \
to implement research experiments. \
For educational purposes, create simplified implementations.";

pub const PAPER_INSTRUCTION: &str = "You are an accomplished research scientist. \
Write clear, rigorous, and well-structured research papers \
in the style of top-tier ML conferences (ICLR, NeurIPS, ICML).";

pub const IDEA_EVALUATION_INSTRUCTION: &str = "You are an expert reviewer at a top ML conference. \
Evaluate research ideas rigorously on consistency, clarity, \
novelty, feasibility, and significance. \
Provide scores from 0-10 and detailed feedback.";

pub const PAPER_EVALUATION_INSTRUCTION: &str = "You are an expert reviewer at a top ML conference. \
Evaluate research papers rigorously on clarity, novelty, soundness, and significance. \
Flag hallucinated or unrealistic results. \
Provide scores from 0-10 and detailed feedback.";

pub fn idea_generation(task: &Task) -> String {
    format!(
        "You are a creative AI research scientist. Generate a novel research idea for the following task:

Task: {title}
Description: {description}
Category: {category}

Generate a research idea that includes:
1. A clear and concise title
2. Motivation: Why is this research important?
3. Main idea: What is the core concept?
4. Methodology: How would you approach this?
5. Expected outcomes: What results do you anticipate?

Be creative, novel, and feasible. The idea should be implementable within a research project.",
        title = task.title,
        description = task.description,
        category = task.category,
    )
}

pub fn literature_review(idea: &ResearchIdea) -> String {
    format!(
        "You are an expert research assistant conducting a literature review.

Research Idea: {idea_title}
Main Concept: {main_idea}

Conduct a literature review that includes:
1. Key findings from related work
2. Identification of the research gap
3. Summary of how existing work relates to this idea

Provide a comprehensive review that situates this research idea in the current state of the field.",
        idea_title = idea.title,
        main_idea = idea.main_idea,
    )
}

pub fn proposal_writing(task: &Task, idea: &ResearchIdea, literature: &LiteratureReview) -> String {
    format!(
        "You are an experienced research scientist writing a detailed research proposal.

Task: {task_title}
Research Idea: {idea_title}
Literature Review Summary: {summary}

Write a complete research proposal with the following sections:
1. Abstract (150-200 words)
2. Introduction (explaining the problem and motivation)
3. Related Work (building on the literature review)
4. Methodology (detailed approach and techniques)
5. Expected Results (anticipated outcomes)
6. Experimental Plan (how to validate the approach)

Write in a clear, academic style suitable for a top-tier ML conference.",
        task_title = task.title,
        idea_title = idea.title,
        summary = literature.related_work_summary,
    )
}

pub fn experiment_coding(proposal: &ResearchProposal) -> String {
    format!(
        "You are an expert ML engineer implementing research experiments.

Research Proposal: {title}
Methodology: {methodology}
Experimental Plan: {plan}

Generate Python code to implement the proposed experiments. Include:
1. Data loading and preprocessing
2. Model implementation
3. Training loop
4. Evaluation metrics
5. Result logging

Use PyTorch or TensorFlow. Keep code modular and well-documented.
For this educational version, create a simplified implementation that demonstrates the concept.",
        title = proposal.title,
        methodology = proposal.methodology,
        plan = proposal.experimental_plan,
    )
}

pub fn paper_writing(task: &Task, proposal: &ResearchProposal, experiment: &ExperimentResult) -> String {
    let results = serde_json::Value::Object(experiment.results.clone());
    format!(
        "You are an accomplished research scientist writing a conference paper.

Task: {task_title}
Proposal: {abstract_text}
Experimental Results: {results}

Write a complete research paper with these sections:
1. Abstract
2. Introduction
3. Related Work
4. Methodology
5. Experiments
6. Results
7. Discussion
8. Conclusion
9. References

Write in the style of a top-tier ML conference paper (ICLR, NeurIPS, ICML).
Be rigorous, clear, and thorough.",
        task_title = task.title,
        abstract_text = proposal.abstract_text,
    )
}

pub fn idea_evaluation(idea: &ResearchIdea) -> String {
    format!(
        "You are an expert reviewer evaluating a research idea.

Research Idea:
Title: {title}
Motivation: {motivation}
Main Idea: {main_idea}

Evaluate this idea on the following criteria (score 0-10 for each):
1. Consistency: Is the idea logically coherent?
2. Clarity: Is the idea clearly explained?
3. Novelty: Is this a novel contribution?
4. Feasibility: Can this be realistically implemented?
5. Significance: Would this have impact on the field?

Provide:
- Scores for each criterion
- Overall score (average)
- Detailed feedback
- Strengths and weaknesses",
        title = idea.title,
        motivation = idea.motivation,
        main_idea = idea.main_idea,
    )
}

/// Paper review prompt. A non-empty `code_files` appends a count line.
pub fn paper_evaluation(paper: &ResearchPaper, code_files: &[String]) -> String {
    let mut prompt = format!(
        "You are an expert reviewer evaluating a research paper.

Paper Title: {title}
Abstract: {abstract_text}

Evaluate this paper on the following criteria (score 0-10 for each):
1. Clarity: Is the paper well-written and clear?
2. Novelty: Does it present novel contributions?
3. Soundness: Is the methodology sound?
4. Significance: Is this work significant?

Also check for:
- Hallucinated results (unrealistic claims)
- Code quality (if provided)

Provide:
- Scores for each criterion
- Overall score
- Detailed feedback
- Strengths and weaknesses",
        title = paper.title,
        abstract_text = paper.abstract_text,
    );
    if !code_files.is_empty() {
        prompt.push_str(&format!("\n\nCode files provided: {}", code_files.len()));
    }
    prompt
}
