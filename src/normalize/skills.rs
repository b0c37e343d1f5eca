//! Skill extraction against a curated lexicon.

/// (needle, canonical label). Every needle is matched as a lowercase
/// substring of the haystack; synonyms map to one canonical label.
const SKILL_LEXICON: &[(&str, &str)] = &[
    ("python", "Python"),
    ("rust", "Rust"),
    ("golang", "Go"),
    ("java", "Java"),
    ("javascript", "JavaScript"),
    ("typescript", "TypeScript"),
    ("react", "React"),
    ("vue", "Vue"),
    ("angular", "Angular"),
    ("node.js", "Node.js"),
    ("nodejs", "Node.js"),
    ("kubernetes", "Kubernetes"),
    ("docker", "Docker"),
    ("terraform", "Terraform"),
    ("aws", "AWS"),
    ("gcp", "GCP"),
    ("azure", "Azure"),
    ("sql", "SQL"),
    ("postgresql", "PostgreSQL"),
    ("postgres", "PostgreSQL"),
    ("mysql", "MySQL"),
    ("mongodb", "MongoDB"),
    ("redis", "Redis"),
    ("kafka", "Kafka"),
    ("spark", "Spark"),
    ("graphql", "GraphQL"),
    ("machine learning", "Machine Learning"),
    ("deep learning", "Machine Learning"),
    ("data science", "Data Science"),
    ("nlp", "NLP"),
    ("llm", "LLM"),
    ("devops", "DevOps"),
    ("ci/cd", "CI/CD"),
    ("sre", "SRE"),
    ("ios", "iOS"),
    ("android", "Android"),
    ("swift", "Swift"),
    ("kotlin", "Kotlin"),
    ("c++", "C++"),
    ("c#", "C#"),
    ("ruby", "Ruby"),
    ("rails", "Rails"),
    ("php", "PHP"),
    ("scala", "Scala"),
    ("elixir", "Elixir"),
    ("figma", "Figma"),
    ("salesforce", "Salesforce"),
    ("tableau", "Tableau"),
    ("excel", "Excel"),
    ("seo", "SEO"),
    ("security", "Security"),
    ("compliance", "Compliance"),
    ("product management", "Product Management"),
];

/// Case-insensitive substring scan of free text (title + description)
/// against the lexicon, deduplicated and sorted for a stable output.
/// Needles prone to firing inside unrelated words are curated out of the
/// lexicon (Go is keyed as "golang") rather than special-cased here.
pub fn extract_skills(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let lowered = text.to_lowercase();
    let mut found: Vec<String> = Vec::new();
    for (needle, label) in SKILL_LEXICON {
        if lowered.contains(needle) && !found.iter().any(|s| s == label) {
            found.push((*label).to_string());
        }
    }

    found.sort();
    found
}
