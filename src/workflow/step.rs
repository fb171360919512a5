use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::llm::Message;

use super::state::SuspensionPoint;

/// Named steps of the lead workflow graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Derive the lead's website and seed the conversation
    ExtractDomain,
    /// Ask the model for the next message
    Agent,
    /// Run the tool calls of the last model message
    Tools,
    /// Hand the draft to a human reviewer
    AskHuman,
    /// Deliver the approved email
    SendEmail,
}

impl Step {
    /// Step name as used in checkpoints and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::ExtractDomain => "extract_domain",
            Step::Agent => "agent",
            Step::Tools => "tools",
            Step::AskHuman => "ask_human",
            Step::SendEmail => "send_email",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a step hands back to the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Continue with another step
    Goto(Step),
    /// Persist and wait for a human decision
    Suspend(SuspensionPoint),
    /// The thread is finished
    End,
}

/// Domain of an email address, unless it belongs to a consumer mail provider.
///
/// The domain is the text after the last `@`. It is rejected when its first
/// label matches one of `providers`, ignoring case and whatever suffix follows.
pub fn extract_domain(email: &str, providers: &[String]) -> Option<String> {
    let (_, domain) = email.rsplit_once('@')?;
    let domain = domain.trim();
    if domain.is_empty() {
        return None;
    }

    let first_label = domain.split('.').next().unwrap_or(domain).to_lowercase();
    if providers.iter().any(|p| p.eq_ignore_ascii_case(&first_label)) {
        return None;
    }

    Some(domain.to_string())
}

/// Website URL of a lead, if the address has a company domain
pub fn lead_website_url(email: &str, providers: &[String]) -> Option<String> {
    extract_domain(email, providers).map(|domain| format!("https://{}", domain))
}

/// First human message of a lead conversation
pub fn seed_message(email: &str, website_url: Option<&str>) -> String {
    let research = match website_url {
        Some(url) => format!(
            " Scrape the corresponding website: {}. Then use the summarizer tool to describe it.",
            url
        ),
        None => String::new(),
    };
    format!(
        "We got the email address of a new lead: {}.{} Then write an outreach email. Only respond with the email body!",
        email, research
    )
}

/// Human message asking the model to revise its last draft
pub fn revision_request(comment: &str) -> String {
    format!(
        "Please revise the previous draft considering the following: {}.\nAgain, only respond with the email body!",
        comment
    )
}

/// Route after the agent step: tool calls go to `tools`, anything else to review
pub fn route_after_agent(messages: &[Message]) -> Result<Step> {
    let last = messages
        .last()
        .ok_or_else(|| Error::contract("agent produced no message"))?;
    Ok(if last.has_tool_calls() {
        Step::Tools
    } else {
        Step::AskHuman
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_consumer_providers;
    use crate::llm::ToolCall;
    use serde_json::json;

    #[test]
    fn test_consumer_domains_are_rejected() {
        let providers = default_consumer_providers();
        assert_eq!(extract_domain("user@gmail.com", &providers), None);
        assert_eq!(extract_domain("User@GMAIL.co.uk", &providers), None);
        assert_eq!(extract_domain("someone@protonmail.ch", &providers), None);
    }

    #[test]
    fn test_company_domains_become_urls() {
        let providers = default_consumer_providers();
        assert_eq!(
            lead_website_url("user@acme.io", &providers).as_deref(),
            Some("https://acme.io")
        );
        assert_eq!(
            lead_website_url("a@b@initech.com", &providers).as_deref(),
            Some("https://initech.com")
        );
        // "mail" is a provider label, "mailchimp" is not
        assert_eq!(
            lead_website_url("ops@mailchimp.com", &providers).as_deref(),
            Some("https://mailchimp.com")
        );
    }

    #[test]
    fn test_addresses_without_domain() {
        let providers = default_consumer_providers();
        assert_eq!(extract_domain("not-an-email", &providers), None);
        assert_eq!(extract_domain("jane@", &providers), None);
    }

    #[test]
    fn test_seed_message() {
        assert_eq!(
            seed_message("jane@initech.com", Some("https://initech.com")),
            "We got the email address of a new lead: jane@initech.com. Scrape the corresponding \
             website: https://initech.com. Then use the summarizer tool to describe it. Then write \
             an outreach email. Only respond with the email body!"
        );
        assert_eq!(
            seed_message("jane@gmail.com", None),
            "We got the email address of a new lead: jane@gmail.com. Then write an outreach email. \
             Only respond with the email body!"
        );
    }

    #[test]
    fn test_route_after_agent() {
        let call = ToolCall::new("call_1", "web_scrape_tool", json!({"url": "https://initech.com"}));
        let with_calls = vec![Message::assistant_tool_calls("", vec![call])];
        assert_eq!(route_after_agent(&with_calls).unwrap(), Step::Tools);

        let draft = vec![Message::assistant("Hi Jane")];
        assert_eq!(route_after_agent(&draft).unwrap(), Step::AskHuman);

        assert!(matches!(route_after_agent(&[]), Err(Error::Contract(_))));
    }

    #[test]
    fn test_step_serialization() {
        assert_eq!(serde_json::to_value(Step::AskHuman).unwrap(), json!("ask_human"));
        assert_eq!(Step::ExtractDomain.to_string(), "extract_domain");
    }
}
