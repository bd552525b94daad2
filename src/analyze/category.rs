//! Curated categories, each a fixed set of lowercase tags.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CuratorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Frontend,
    Backend,
    AiMl,
    InfraDevops,
    Mobile,
    Security,
    Trending,
}

const FRONTEND: &[&str] = &[
    "react", "vue", "angular", "svelte", "nextjs", "next.js", "nuxt", "javascript",
    "typescript", "css", "tailwind", "tailwindcss", "html", "frontend", "ui", "ux", "web",
    "browser", "dom", "webpack", "vite", "esbuild", "babel", "storybook",
];

const BACKEND: &[&str] = &[
    "node", "nodejs", "express", "fastify", "nestjs", "python", "django", "flask", "fastapi",
    "ruby", "rails", "go", "golang", "rust", "java", "spring", "kotlin", "scala", "api",
    "rest", "graphql", "grpc", "backend", "database", "postgresql", "mysql", "mongodb",
    "redis", "sql",
];

const AI_ML: &[&str] = &[
    "ai", "ml", "machine-learning", "machinelearning", "deep-learning", "deeplearning",
    "neural-network", "llm", "gpt", "openai", "chatgpt", "claude", "langchain", "tensorflow",
    "pytorch", "keras", "scikit-learn", "nlp", "computer-vision", "data-science",
    "datascience", "pandas", "numpy", "jupyter",
];

const INFRA_DEVOPS: &[&str] = &[
    "aws", "gcp", "azure", "cloud", "vercel", "netlify", "docker", "kubernetes", "k8s",
    "container", "terraform", "ansible", "pulumi", "ci", "cd", "cicd", "github-actions",
    "jenkins", "circleci", "devops", "sre", "infrastructure", "linux", "nginx", "monitoring",
    "observability", "prometheus", "grafana",
];

const MOBILE: &[&str] = &[
    "ios", "android", "mobile", "swift", "swiftui", "kotlin", "react-native", "reactnative",
    "flutter", "dart", "expo", "capacitor", "ionic", "xamarin", "app", "native",
    "cross-platform",
];

const SECURITY: &[&str] = &[
    "security", "cybersecurity", "infosec", "authentication", "auth", "oauth", "jwt",
    "passkey", "encryption", "cryptography", "ssl", "tls", "https", "vulnerability",
    "penetration-testing", "ctf", "xss", "csrf", "injection", "owasp",
];

const TRENDING: &[&str] = &[
    "trending", "new", "release", "announcement", "cursor", "copilot", "devin", "v0", "web3",
    "blockchain", "crypto", "wasm", "webassembly", "edge", "serverless", "bun", "deno",
    "htmx", "astro", "qwik",
];

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Frontend,
        Category::Backend,
        Category::AiMl,
        Category::InfraDevops,
        Category::Mobile,
        Category::Security,
        Category::Trending,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Category::Frontend => "frontend",
            Category::Backend => "backend",
            Category::AiMl => "ai-ml",
            Category::InfraDevops => "infra-devops",
            Category::Mobile => "mobile",
            Category::Security => "security",
            Category::Trending => "trending",
        }
    }

    /// Lowercase tags belonging to this category.
    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            Category::Frontend => FRONTEND,
            Category::Backend => BACKEND,
            Category::AiMl => AI_ML,
            Category::InfraDevops => INFRA_DEVOPS,
            Category::Mobile => MOBILE,
            Category::Security => SECURITY,
            Category::Trending => TRENDING,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Category {
    type Err = CuratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.id() == s)
            .ok_or_else(|| CuratorError::InvalidRequest(format!("unknown category '{s}'")))
    }
}

/// Union of the tag sets of every given category.
pub fn tags_for_categories<'a, I>(categories: I) -> BTreeSet<&'static str>
where
    I: IntoIterator<Item = &'a Category>,
{
    categories
        .into_iter()
        .flat_map(|c| c.tags().iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for c in Category::ALL {
            assert_eq!(c.id().parse::<Category>().unwrap(), c);
        }
        assert!("gamedev".parse::<Category>().is_err());
    }

    #[test]
    fn union_merges_shared_tags() {
        // "kotlin" lives in both backend and mobile.
        let tags = tags_for_categories(&[Category::Backend, Category::Mobile]);
        assert!(tags.contains("kotlin"));
        assert!(tags.contains("rust"));
        assert!(tags.contains("flutter"));
        assert_eq!(
            tags.len(),
            BACKEND.len() + MOBILE.len() - 1,
            "kotlin should be counted once"
        );
        assert!(tags_for_categories(&[] as &[Category]).is_empty());
    }

    #[test]
    fn serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&Category::AiMl).unwrap(), "\"ai-ml\"");
    }
}
