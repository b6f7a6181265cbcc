use extractors::ResponseShape;
use shared_types::VisaRequirement;

pub const SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant that extracts visa requirement information from text.";

/// Instruction prompt for one chat message, asking for the given output shape.
///
/// The message is embedded verbatim.
pub fn build_prompt(message: &str, shape: ResponseShape) -> String {
    format!(
        r#"{system}

Extract visa requirement information for refugee travel document (RTD) holders from the
message below and reply with exactly one record in this format:

{template}

Rules:
- **country**: the country the message is about, as written in the message
- **visaRequirement**: exactly one of [{allowed}]
- **duration**: allowed length of stay (e.g. "90 days"), or "N/A" if not stated
- **notes**: anything else relevant for RTD holders, or "N/A"

Message: {message}"#,
        system = SYSTEM_INSTRUCTION,
        template = template(shape),
        allowed = allowed_requirements(),
        message = message,
    )
}

fn template(shape: ResponseShape) -> &'static str {
    match shape {
        ResponseShape::Json => {
            r#"{
    "country": "",
    "visaRequirement": "",
    "duration": "",
    "notes": ""
}"#
        }
        ResponseShape::KeyValue => {
            r#"country="" visaRequirement="" duration="" notes="""#
        }
    }
}

fn allowed_requirements() -> String {
    VisaRequirement::ALL
        .iter()
        .map(|requirement| format!("\"{}\"", requirement.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}
