//! Canned stand-ins for the backend's AI helpers.
//!
//! Results are deterministic so that clients can be tested against them.

use std::collections::BTreeMap;

use genwatch_shared::dto::{
    AppGenerationRequest, AppGenerationResponse, CodeGenerationRequest, CodeGenerationResponse,
    CodeLanguage, ServiceInfo, Technology, TechnologyRole,
};

const GREETING: &str = "Hello from genwatch";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssistantError {
    #[error("Instructions are required")]
    EmptyInstructions,
    #[error("At least one technology is required")]
    NoTechnologies,
}

/// Polish a chat message: collapse whitespace, capitalize, end with punctuation.
pub fn improve_message(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    let mut improved = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => return String::new(),
    };
    if !improved.ends_with(['.', '!', '?']) {
        improved.push('.');
    }
    improved
}

/// Generate a runnable snippet for `request` together with its output.
pub fn generate_code(
    request: &CodeGenerationRequest,
) -> Result<CodeGenerationResponse, AssistantError> {
    let Some(summary) = first_line(&request.instructions) else {
        return Err(AssistantError::EmptyInstructions);
    };

    let code = match request.language {
        CodeLanguage::Python => format!("# {}\nprint(\"{}\")\n", summary, GREETING),
        CodeLanguage::Javascript => format!("// {}\nconsole.log(\"{}\");\n", summary, GREETING),
    };
    Ok(CodeGenerationResponse {
        code,
        output: format!("{}\n", GREETING),
    })
}

/// Scaffold an application for the requested stack.
///
/// A stack entry without a name is reported in `validation_errors`; in that
/// case no files are produced and no service is started.
pub fn generate_application(
    request: &AppGenerationRequest,
) -> Result<AppGenerationResponse, AssistantError> {
    let Some(summary) = first_line(&request.instructions) else {
        return Err(AssistantError::EmptyInstructions);
    };
    if request.technologies.is_empty() {
        return Err(AssistantError::NoTechnologies);
    }

    let validation_errors: Vec<String> = request
        .technologies
        .iter()
        .enumerate()
        .filter(|(_, technology)| technology.name.trim().is_empty())
        .map(|(i, technology)| {
            format!(
                "Technology #{} ({}) has no name",
                i + 1,
                technology.role.label()
            )
        })
        .collect();
    if !validation_errors.is_empty() {
        return Ok(AppGenerationResponse {
            files: BTreeMap::new(),
            message: "The requested stack is incomplete".to_string(),
            validation_errors: Some(validation_errors),
            services: BTreeMap::new(),
        });
    }

    let mut files = BTreeMap::new();
    files.insert("README.md".to_string(), readme(summary, &request.technologies));
    let mut services = BTreeMap::new();
    for technology in &request.technologies {
        let role = technology.role.label();
        if matches!(
            technology.role,
            TechnologyRole::Frontend | TechnologyRole::Backend
        ) {
            files.insert(format!("{}/Dockerfile", role), dockerfile(technology));
        }
        if let Some(url) = service_url(technology.role) {
            services.insert(
                role.to_string(),
                ServiceInfo {
                    url,
                    status: "running".to_string(),
                },
            );
        }
    }
    files.insert(
        "docker-compose.yml".to_string(),
        compose_file(services.keys()),
    );

    Ok(AppGenerationResponse {
        message: format!("Application generated with {} files", files.len()),
        files,
        validation_errors: None,
        services,
    })
}

fn first_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).find(|line| !line.is_empty())
}

fn readme(summary: &str, technologies: &[Technology]) -> String {
    let mut readme = format!("# {}\n\n## Stack\n\n", summary);
    for technology in technologies {
        readme.push_str(&format!(
            "- {}: {} {}\n",
            technology.role.label(),
            technology.name,
            technology.version
        ));
    }
    readme
}

fn dockerfile(technology: &Technology) -> String {
    let tag = if technology.version.trim().is_empty() {
        "latest"
    } else {
        technology.version.trim()
    };
    format!("FROM {}:{}\n", technology.name.to_lowercase(), tag)
}

fn compose_file<'a>(services: impl Iterator<Item = &'a String>) -> String {
    let mut compose = "services:\n".to_string();
    for service in services {
        compose.push_str(&format!("  {}:\n    build: ./{}\n", service, service));
    }
    compose
}

fn service_url(role: TechnologyRole) -> Option<String> {
    let port = match role {
        TechnologyRole::Frontend => 3000,
        TechnologyRole::Backend => 8080,
        TechnologyRole::Database => 5432,
        TechnologyRole::Infrastructure | TechnologyRole::Other => return None,
    };
    Some(format!("http://localhost:{}", port))
}
