//! Prompt assembly for the sales agent persona.
//!
//! Every generation turn gets the full persona and campaign context plus
//! the conversation so far, rendered as alternating `Customer:` / `AI:`
//! lines, so the stateless generation endpoint still behaves like a
//! consistent participant in the call.

use crate::core::session::{CampaignContext, LeadContext};

/// Persona and campaign preamble shared by every prompt of a call.
pub fn persona(lead: &LeadContext, campaign: &CampaignContext) -> String {
    let mut text = format!(
        "You are a friendly, professional sales agent making an outbound phone call \
         on behalf of {}.",
        campaign.name
    );
    if !campaign.description.trim().is_empty() {
        text.push(' ');
        text.push_str(campaign.description.trim());
    }
    text.push_str(&format!("\nYou are speaking with {}", lead.name));
    if let Some(designation) = lead.designation.as_deref().filter(|d| !d.trim().is_empty()) {
        text.push_str(&format!(", {designation}"));
    }
    if let Some(organisation) = lead
        .organisation
        .as_deref()
        .filter(|o| !o.trim().is_empty())
    {
        text.push_str(&format!(" at {organisation}"));
    }
    text.push('.');
    text.push_str(
        "\nKeep replies short and conversational, one to three sentences, suitable for \
         being read aloud over the phone. Plain spoken text only, no markdown or lists.",
    );
    text
}

/// Prompt for the scripted opening turn, issued as soon as the media
/// stream starts and before any caller audio is processed.
pub fn intro_prompt(lead: &LeadContext, campaign: &CampaignContext) -> String {
    format!(
        "{}\n\nOpen the call now. Greet {} by name, say who you are calling on behalf of, \
         and give a one-sentence reason for the call. End with a short question that \
         invites a reply.\n\nAI:",
        persona(lead, campaign),
        lead.name
    )
}

/// Prompt for a regular response turn. `prior_turns` is the rendered
/// history before the current utterance, which is appended separately.
pub fn response_prompt(
    lead: &LeadContext,
    campaign: &CampaignContext,
    prior_turns: &str,
    transcript: &str,
) -> String {
    let mut text = persona(lead, campaign);
    if !prior_turns.is_empty() {
        text.push_str("\n\nConversation so far:\n");
        text.push_str(prior_turns);
    }
    text.push_str(&format!("\n\nCustomer: '{transcript}'\n\nAI:"));
    text
}
