// ==================== RECIPE IMPORT ====================
// Fetches a recipe page and pulls the schema.org `Recipe` out of its
// JSON-LD blocks. Pages without structured data fall back to `<title>`.

use lazy_static::lazy_static;
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use crate::utils::error::AppError;

const FETCH_TIMEOUT_SECS: u64 = 15;
const MAX_PAGE_BYTES: usize = 5 * 1024 * 1024;
const MAX_REDIRECTS: usize = 5;

lazy_static! {
    static ref HTTP_CLIENT: Result<reqwest::Client, String> = reqwest::Client::builder()
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .user_agent(concat!("recipe-service/", env!("CARGO_PKG_VERSION")))
        .dns_resolver(Arc::new(PublicOnlyResolver))
        .redirect(reqwest::redirect::Policy::custom(|attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error("too many redirects");
            }
            match check_target(attempt.url()) {
                Ok(()) => attempt.follow(),
                Err(e) => attempt.error(e.to_string()),
            }
        }))
        .build()
        .map_err(|e| e.to_string());
}

/// Recipe fields recovered from a page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ExtractedRecipe {
    pub title: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub keywords: Vec<String>,
    /// `false` when only the page title could be recovered
    pub structured: bool,
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    let shared = a == 100 && (64..128).contains(&b);
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast()
        || a == 0
        || shared)
}

fn is_public_v6(ip: Ipv6Addr) -> bool {
    let first = ip.segments()[0];
    let unique_local = first & 0xfe00 == 0xfc00;
    let link_local = first & 0xffc0 == 0xfe80;
    !(ip.is_loopback() || ip.is_unspecified() || ip.is_multicast() || unique_local || link_local)
}

/// Addresses the importer is allowed to connect to
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(v4),
            None => is_public_v6(v6),
        },
    }
}

/// Scheme check plus a block on literal non-public IPs. Named hosts are
/// checked at resolution time by `PublicOnlyResolver`.
fn check_target(url: &reqwest::Url) -> Result<(), AppError> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AppError::InvalidRequest("Only http(s) URLs can be imported".to_string()));
    }

    let host = url
        .host_str()
        .ok_or_else(|| AppError::InvalidRequest("URL has no host".to_string()))?;
    let literal = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = literal.parse::<IpAddr>() {
        if !is_public_ip(ip) {
            return Err(AppError::InvalidRequest(format!("Address {} cannot be imported from", ip)));
        }
    }
    Ok(())
}

/// Resolves `host` and fails if any address is not public
async fn resolve_public(host: &str) -> Result<Vec<SocketAddr>, String> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, 0))
        .await
        .map_err(|e| format!("Failed to resolve {}: {}", host, e))?
        .collect();

    if addrs.is_empty() {
        return Err(format!("{} did not resolve", host));
    }
    if let Some(blocked) = addrs.iter().find(|addr| !is_public_ip(addr.ip())) {
        return Err(format!("{} resolves to non-public address {}", host, blocked.ip()));
    }
    Ok(addrs)
}

struct PublicOnlyResolver;

impl Resolve for PublicOnlyResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        Box::pin(async move {
            let resolved: Result<Addrs, Box<dyn std::error::Error + Send + Sync>> = match resolve_public(&host).await {
                Ok(addrs) => Ok(Box::new(addrs.into_iter())),
                Err(e) => Err(e.into()),
            };
            resolved
        })
    }
}

fn check_declared_length(length: Option<u64>) -> Result<(), AppError> {
    match length {
        Some(length) if length > MAX_PAGE_BYTES as u64 => {
            Err(AppError::Upstream("Page is too large to import".to_string()))
        }
        _ => Ok(()),
    }
}

fn append_capped(body: &mut Vec<u8>, chunk: &[u8]) -> Result<(), AppError> {
    if body.len() + chunk.len() > MAX_PAGE_BYTES {
        return Err(AppError::Upstream("Page is too large to import".to_string()));
    }
    body.extend_from_slice(chunk);
    Ok(())
}

pub async fn scrape_url(url: &str) -> Result<ExtractedRecipe, AppError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| AppError::InvalidRequest(format!("Invalid URL: {}", e)))?;
    check_target(&parsed)?;

    let client = HTTP_CLIENT
        .as_ref()
        .map_err(|e| AppError::Upstream(format!("HTTP client unavailable: {}", e)))?;

    log::info!("🌐 Fetching recipe page: {}", parsed);
    let mut response = client
        .get(parsed)
        .send()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to fetch page: {}", e)))?;

    if !response.status().is_success() {
        return Err(AppError::Upstream(format!("Page returned {}", response.status())));
    }
    check_declared_length(response.content_length())?;

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| AppError::Upstream(format!("Failed to read page: {}", e)))?
    {
        append_capped(&mut body, &chunk)?;
    }
    let html = String::from_utf8_lossy(&body);

    extract_recipe_from_html(&html)
        .ok_or_else(|| AppError::InvalidRequest("No recipe found on that page".to_string()))
}

/// Finds a schema.org Recipe in the page, or falls back to the `<title>`
pub fn extract_recipe_from_html(html: &str) -> Option<ExtractedRecipe> {
    for block in json_ld_blocks(html) {
        let Ok(value) = serde_json::from_str::<Value>(block.trim()) else {
            continue;
        };
        if let Some(node) = find_recipe_node(&value) {
            return Some(recipe_from_node(node));
        }
    }

    page_title(html).map(|title| ExtractedRecipe {
        title,
        ..ExtractedRecipe::default()
    })
}

fn json_ld_blocks(html: &str) -> Vec<&str> {
    let lower = html.to_ascii_lowercase();
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(start) = lower[cursor..].find("<script") {
        let tag_start = cursor + start;
        let Some(tag_len) = lower[tag_start..].find('>') else { break };
        let body_start = tag_start + tag_len + 1;
        let Some(body_len) = lower[body_start..].find("</script") else { break };

        if lower[tag_start..body_start].contains("application/ld+json") {
            blocks.push(&html[body_start..body_start + body_len]);
        }
        cursor = body_start + body_len;
    }

    blocks
}

fn is_recipe_type(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(t)) => t == "Recipe",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Recipe")),
        _ => false,
    }
}

fn find_recipe_node(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_recipe_node),
        Value::Object(map) => {
            if is_recipe_type(value) {
                return Some(value);
            }
            map.get("@graph").and_then(find_recipe_node)
        }
        _ => None,
    }
}

fn text_of(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

// Instructions come as a string, a list of strings, HowToStep objects,
// or HowToSection objects wrapping steps.
fn instruction_steps(value: Option<&Value>, out: &mut Vec<String>) {
    match value {
        Some(Value::String(s)) => out.extend(
            s.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
        ),
        Some(Value::Array(items)) => {
            for item in items {
                instruction_steps(Some(item), out);
            }
        }
        Some(Value::Object(map)) => {
            if map.contains_key("itemListElement") {
                instruction_steps(map.get("itemListElement"), out);
            } else {
                let text = text_of(map.get("text").or_else(|| map.get("name")));
                if !text.is_empty() {
                    out.push(text);
                }
            }
        }
        _ => {}
    }
}

fn recipe_from_node(node: &Value) -> ExtractedRecipe {
    let mut instructions = Vec::new();
    instruction_steps(node.get("recipeInstructions"), &mut instructions);

    ExtractedRecipe {
        title: text_of(node.get("name")),
        description: text_of(node.get("description")),
        ingredients: string_list(node.get("recipeIngredient")),
        instructions,
        keywords: string_list(node.get("keywords")),
        structured: true,
    }
}

fn page_title(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title")?;
    let title = html[start..end].trim();
    (!title.is_empty()).then(|| title.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_public_addresses_are_blocked() {
        for blocked in ["127.0.0.1", "10.1.2.3", "172.16.0.9", "192.168.1.1", "169.254.169.254", "0.0.0.0", "100.64.0.1", "::1", "fe80::1", "fd00::1", "::ffff:127.0.0.1"] {
            assert!(!is_public_ip(blocked.parse().unwrap()), "{} should be blocked", blocked);
        }
        for allowed in ["93.184.216.34", "8.8.8.8", "2606:4700::1111"] {
            assert!(is_public_ip(allowed.parse().unwrap()), "{} should be allowed", allowed);
        }
    }

    #[test]
    fn test_literal_private_targets_are_rejected() {
        for url in ["http://127.0.0.1:27017/", "http://169.254.169.254/latest/meta-data", "http://[::1]:8080/", "http://10.0.0.5/", "ftp://example.com/"] {
            let parsed = reqwest::Url::parse(url).unwrap();
            assert!(matches!(check_target(&parsed), Err(AppError::InvalidRequest(_))), "{}", url);
        }
        assert!(check_target(&reqwest::Url::parse("https://example.com/pie").unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_scrape_rejects_loopback_before_fetching() {
        let err = scrape_url("http://127.0.0.1:27017/").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_names_resolving_to_loopback_are_rejected() {
        assert!(resolve_public("localhost").await.is_err());
    }

    #[test]
    fn test_body_is_capped_while_reading() {
        assert!(check_declared_length(Some(MAX_PAGE_BYTES as u64 + 1)).is_err());
        assert!(check_declared_length(None).is_ok());

        let mut body = vec![0u8; MAX_PAGE_BYTES - 10];
        assert!(append_capped(&mut body, &[1u8; 10]).is_ok());
        assert!(matches!(append_capped(&mut body, &[1u8]), Err(AppError::Upstream(_))));
        assert_eq!(body.len(), MAX_PAGE_BYTES);
    }

    #[test]
    fn test_extracts_plain_recipe_block() {
        let html = r#"<html><head>
            <script type="application/ld+json">
            {"@context":"https://schema.org","@type":"Recipe","name":"Pancakes",
             "description":"Fluffy","recipeIngredient":["2 eggs","1 cup flour"],
             "recipeInstructions":"Mix.\nFry.","keywords":"breakfast, quick"}
            </script></head></html>"#;

        let recipe = extract_recipe_from_html(html).unwrap();
        assert_eq!(recipe.title, "Pancakes");
        assert_eq!(recipe.ingredients, vec!["2 eggs", "1 cup flour"]);
        assert_eq!(recipe.instructions, vec!["Mix.", "Fry."]);
        assert_eq!(recipe.keywords, vec!["breakfast", "quick"]);
        assert!(recipe.structured);
    }

    #[test]
    fn test_extracts_recipe_from_graph_with_how_to_steps() {
        let html = r#"<script type="application/ld+json">{"@graph":[
            {"@type":"WebPage","name":"Blog"},
            {"@type":["Recipe","NewsArticle"],"name":"Soup","recipeInstructions":[
                {"@type":"HowToSection","itemListElement":[{"@type":"HowToStep","text":"Boil"}]},
                {"@type":"HowToStep","text":"Serve"}]}]}</script>"#;

        let recipe = extract_recipe_from_html(html).unwrap();
        assert_eq!(recipe.title, "Soup");
        assert_eq!(recipe.instructions, vec!["Boil", "Serve"]);
    }

    #[test]
    fn test_skips_invalid_json_and_falls_back_to_title() {
        let html = r#"<title> Grandma's Stew </title>
            <script type="application/ld+json">{not json</script>
            <script>var x = 1;</script>"#;

        let recipe = extract_recipe_from_html(html).unwrap();
        assert_eq!(recipe.title, "Grandma's Stew");
        assert!(!recipe.structured);
    }

    #[test]
    fn test_nothing_to_extract() {
        assert!(extract_recipe_from_html("<html><body>hi</body></html>").is_none());
    }

    #[tokio::test]
    async fn test_rejects_non_http_urls() {
        let err = scrape_url("ftp://example.com/x").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }
}
