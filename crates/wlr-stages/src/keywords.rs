//! Technical vocabulary used by the deterministic quality heuristics.
//!
//! Entries are lower-case stems matched as substrings, so "serializ" covers
//! "serialize", "serialization" and "serializer".

pub static TECHNICAL_MARKERS: &[&str] = &[
    // general programming
    "implement", "function", "class", "method", "variable", "loop",
    "condition", "import", "export", "algorithm", "structure", "pattern",
    "module", "library", "framework", "interface", "abstract", "inherit",
    "polymorphism", "encapsulat", "recursion", "callback", "promise",
    "async", "await", "thread", "concurren", "exception", "syntax",
    // backend
    "api", "endpoint", "route", "server", "client", "database", "query",
    "migration", "schema", "model", "middleware", "serializ",
    "authenticat", "authoriz", "token", "session", "cache", "orm",
    "crud", "rest", "graphql", "websocket", "microservice",
    // frontend
    "component", "hook", "props", "render", "dom", "css",
    "html", "layout", "responsive", "flexbox", "grid", "animation",
    "listener", "selector", "stylesheet", "bundl", "webpack",
    "vite", "redux", "router", "jsx", "tsx", "virtual dom",
    // data and ml
    "tensor", "epoch", "gradient", "dataset", "regression", "classificat",
    "cluster", "neural", "weight", "loss", "accurac", "precision",
    "recall", "pandas", "numpy", "matplotlib", "sklearn", "pytorch", "tensorflow",
    // ops
    "deploy", "config", "docker", "container", "pipeline", "ci/cd",
    "kubernetes", "nginx", "ssl", "dns", "load balanc", "monitor",
    "logging", "terraform", "ansible", "aws", "azure",
    // testing and debugging
    "assert", "mock", "fixture", "coverage", "unit test",
    "integrat", "e2e", "debug", "stack trace", "breakpoint", "lint", "refactor",
    // mobile
    "android", "ios", "swift", "kotlin", "flutter", "react native",
    // security
    "encrypt", "hash", "cors", "csrf", "xss", "injection", "firewall",
    "vulnerab", "oauth", "jwt", "certificate",
    // data stores
    "sql", "nosql", "index", "join", "normali", "transaction",
    "foreign key", "primary key", "constraint", "trigger", "stored proc",
    "redis", "mongo", "postgres", "mysql",
    // version control
    "git", "branch", "merge", "commit", "pull request", "repository",
];

/// Number of distinct markers present in `text`.
pub fn count_technical_markers(text: &str) -> usize {
    let lower = text.to_lowercase();
    TECHNICAL_MARKERS
        .iter()
        .filter(|m| lower.contains(*m))
        .count()
}
