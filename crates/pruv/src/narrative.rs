//! Human-readable receipt narratives.
//!
//! A narrative is a pure function of a loaded record and its verification
//! result: the same inputs always render the same text. Sections appear in
//! a fixed order (header, declared attributes, verification counts,
//! timeline, checklist) followed by a warning block only when the chain is
//! broken or records unauthorized entries.

use chrono::DateTime;
use pruv_core::BreakDetail;
use pruv_identity::{AgentIdentity, IdentityPayload, VerificationResult};
use pruv_provenance::{Artifact, ProvenancePayload, ProvenanceVerificationResult};
use pruv_registry::Record;

/// Accumulates narrative lines.
#[derive(Default)]
struct Narrative {
    lines: Vec<String>,
}

impl Narrative {
    fn header(&mut self, title: &str) {
        self.lines.push(title.to_string());
        self.lines.push("=".repeat(title.chars().count()));
    }

    fn section(&mut self, title: &str) {
        self.lines.push(String::new());
        self.lines.push(title.to_string());
    }

    fn line(&mut self, text: impl Into<String>) {
        self.lines.push(text.into());
    }

    fn item(&mut self, text: impl AsRef<str>) {
        self.lines.push(format!("  {}", text.as_ref()));
    }

    fn check(&mut self, passed: bool, text: &str) {
        let mark = if passed { "[PASS]" } else { "[FAIL]" };
        self.lines.push(format!("  {mark} {text}"));
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}

/// Format Unix milliseconds as a UTC timestamp.
pub fn format_time(millis: i64) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("{millis} ms"),
    }
}

fn short(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

fn break_line(detail: &BreakDetail, entries: usize) -> String {
    format!(
        "Chain integrity broken at entry {} ({} check failed, entry recorded {}). Entries {} through {} cannot be trusted.",
        detail.index,
        detail.failure.as_str(),
        format_time(detail.entry_timestamp),
        detail.index,
        entries.saturating_sub(1),
    )
}

/// Narrative for an agent identity.
pub fn identity_narrative(record: &Record<AgentIdentity>, result: &VerificationResult) -> String {
    let identity = &record.metadata;
    let mut n = Narrative::default();

    n.header("pruv identity receipt");
    let verdict = if !result.intact {
        "BROKEN"
    } else if result.is_trustworthy() {
        "VERIFIED"
    } else {
        "VERIFIED WITH FINDINGS"
    };
    n.line(format!(
        "Agent \"{}\" ({}) is {}: {}/{} entries verified, status {}.",
        identity.name,
        identity.id,
        verdict,
        result.verified_count,
        result.entries,
        if result.active { "active" } else { "inactive" },
    ));

    n.section("Declared attributes");
    n.item(format!("Name: {}", identity.name));
    n.item(format!("Owner: {}", identity.owner));
    if !identity.framework.is_empty() {
        n.item(format!("Framework: {}", identity.framework));
    }
    if !identity.purpose.is_empty() {
        n.item(format!("Purpose: {}", identity.purpose));
    }
    n.item(format!("Scope: {}", identity.scope.join(", ")));
    n.item(format!("Valid from: {}", format_time(identity.valid_from)));
    n.item(format!(
        "Valid until: {}",
        identity
            .valid_until
            .map_or_else(|| "no expiry".to_string(), format_time)
    ));
    match (identity.revoked_at, &identity.revocation_reason) {
        (Some(at), reason) => n.item(format!(
            "Status: revoked at {} ({})",
            format_time(at),
            reason.as_deref().unwrap_or("no reason given")
        )),
        (None, _) => n.item(format!("Status: {}", identity.status.as_str())),
    }

    n.section("Verification");
    n.item(format!("Entries: {}", result.entries));
    n.item(format!("Verified: {}/{}", result.verified_count, result.entries));
    n.item(format!(
        "Actions: {} ({} in scope, {} out of scope)",
        result.action_count,
        result.in_scope_count,
        result.out_of_scope_actions.len()
    ));
    n.item(format!("Signature failures: {}", result.signature_failures.len()));

    n.section("Timeline");
    for (entry, payload) in record.chain.decode_payloads::<IdentityPayload>() {
        let at = format_time(entry.timestamp);
        let text = match payload {
            Some(IdentityPayload::Registration(r)) => {
                format!("registered \"{}\" with scope [{}]", r.name, r.scope.join(", "))
            }
            Some(IdentityPayload::Action(a)) => format!(
                "{} [{}] {}",
                a.action,
                a.action_scope,
                if a.in_scope { "in scope" } else { "OUT OF SCOPE" }
            ),
            Some(IdentityPayload::Revocation(r)) => format!("revoked: {}", r.reason),
            None => format!("{} (undecodable entry)", entry.operation),
        };
        n.item(format!("#{} {} {}", entry.index, at, text));
    }

    n.section("Checklist");
    n.check(result.intact, "Chain intact");
    n.check(result.active, "Identity active and within validity window");
    n.check(
        result.out_of_scope_actions.is_empty(),
        "All actions within declared scope",
    );
    n.check(result.signatures_valid, "Signatures valid");

    let warn =
        !result.intact || !result.out_of_scope_actions.is_empty() || !result.signatures_valid;
    if warn {
        n.section("WARNING");
        if let Some(detail) = &result.break_detail {
            n.item(break_line(detail, result.entries));
        } else if let Some(at) = result.break_at {
            n.item(format!("Chain integrity broken at entry {at}."));
        }
        for action in &result.out_of_scope_actions {
            n.item(format!(
                "Out-of-scope action at entry {}: {} [{}] on {}",
                action.entry_index,
                action.action,
                action.action_scope,
                format_time(action.timestamp)
            ));
        }
        for failure in &result.signature_failures {
            n.item(format!(
                "Invalid signature at entry {}: {}",
                failure.index, failure.reason
            ));
        }
    }

    n.finish()
}

/// Narrative for an artifact.
pub fn provenance_narrative(
    record: &Record<Artifact>,
    result: &ProvenanceVerificationResult,
) -> String {
    let artifact = &record.metadata;
    let mut n = Narrative::default();

    n.header("pruv provenance receipt");
    let verdict = if !result.intact {
        "BROKEN"
    } else if !result.valid {
        "INVALID"
    } else if !result.authorized() {
        "VALID WITH UNAUTHORIZED TRANSITIONS"
    } else {
        "VERIFIED"
    };
    n.line(format!(
        "Artifact \"{}\" ({}) is {}: {}/{} entries verified, {} transitions.",
        artifact.name,
        artifact.id,
        verdict,
        result.verified_count,
        result.entries,
        result.transition_count,
    ));

    n.section("Declared attributes");
    n.item(format!("Name: {}", artifact.name));
    n.item(format!("Owner: {}", artifact.owner));
    if !artifact.classification.is_empty() {
        n.item(format!("Classification: {}", artifact.classification));
    }
    n.item(format!("Created: {}", format_time(artifact.created_at)));
    n.item(format!("Origin hash: {}", artifact.origin_hash));
    n.item(format!("Current state hash: {}", artifact.current_state_hash));

    n.section("Verification");
    n.item(format!("Entries: {}", result.entries));
    n.item(format!("Verified: {}/{}", result.verified_count, result.entries));
    n.item(format!("Transitions: {}", result.transition_count));
    n.item(format!(
        "Unauthorized transitions: {}",
        result.unauthorized_transitions.len()
    ));
    n.item(format!("Thread breaks: {}", result.thread_breaks.len()));
    n.item(format!("Signature failures: {}", result.signature_failures.len()));

    n.section("Timeline");
    for (entry, payload) in record.chain.decode_payloads::<ProvenancePayload>() {
        let at = format_time(entry.timestamp);
        let text = match payload {
            Some(ProvenancePayload::Origin(o)) => {
                format!("origin \"{}\" content {}", o.name, short(&o.content_hash))
            }
            Some(ProvenancePayload::Transition(t)) => {
                let standing = result
                    .unauthorized_transitions
                    .iter()
                    .find(|u| u.entry_index == entry.index)
                    .map_or_else(
                        || "authorized".to_string(),
                        |u| format!("UNAUTHORIZED: {}", u.reason.describe()),
                    );
                format!(
                    "transition {} by {} ({}): {} -> {} [{}]",
                    t.transition_number,
                    t.agent_name,
                    t.agent_id,
                    t.reason,
                    short(&t.content_hash),
                    standing
                )
            }
            None => format!("{} (undecodable entry)", entry.operation),
        };
        n.item(format!("#{} {} {}", entry.index, at, text));
    }

    n.section("Checklist");
    n.check(result.intact, "Chain intact");
    n.check(result.origin_verified, "Origin hash matches genesis entry");
    n.check(result.thread_breaks.is_empty(), "Hash thread continuous");
    n.check(result.current_state_verified, "Current state matches last transition");
    n.check(result.authorized(), "All transitions authorized by live agent verification");
    n.check(result.signatures_valid, "Signatures valid");

    let warn = !result.intact
        || !result.origin_verified
        || !result.current_state_verified
        || !result.authorized()
        || !result.thread_breaks.is_empty()
        || !result.signatures_valid;
    if warn {
        n.section("WARNING");
        if let Some(detail) = &result.break_detail {
            n.item(break_line(detail, result.entries));
        } else if let Some(at) = result.break_at {
            n.item(format!("Chain integrity broken at entry {at}."));
        }
        if let Some(agent) = &result.break_at_agent {
            n.item(format!("The broken entry records a transition by agent {agent}."));
        }
        if !result.origin_verified {
            n.item(format!(
                "Stored origin hash {} does not match the genesis entry's content hash.",
                short(&artifact.origin_hash)
            ));
        }
        if !result.current_state_verified {
            n.item(format!(
                "Stored current state hash {} does not match the last transition's content hash.",
                short(&artifact.current_state_hash)
            ));
        }
        let untrusted = result.untrusted_transitions();
        if !untrusted.is_empty() {
            let list: Vec<String> = untrusted
                .iter()
                .map(|t| {
                    format!(
                        "transition {} (entry {}, by {})",
                        t.transition_number, t.entry_index, t.agent_id
                    )
                })
                .collect();
            n.item(format!(
                "Transitions downstream of the break can no longer be trusted: {}",
                list.join("; ")
            ));
        }
        for t in &result.unauthorized_transitions {
            n.item(format!(
                "Unauthorized transition {} at entry {} by {}: {}",
                t.transition_number,
                t.entry_index,
                t.agent_id,
                t.reason.describe()
            ));
        }
        for b in &result.thread_breaks {
            n.item(format!(
                "Hash thread broken at entry {}: expected previous {}, found {}",
                b.entry_index,
                short(&b.expected_previous_hash),
                short(&b.found_previous_hash)
            ));
        }
        for failure in &result.signature_failures {
            n.item(format!(
                "Invalid signature at entry {}: {}",
                failure.index, failure.reason
            ));
        }
    }

    n.finish()
}
