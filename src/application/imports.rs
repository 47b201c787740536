//! Import frequency analysis
//!
//! Post-index pass counting how many files import each file. Imports are
//! extracted with a language-agnostic regex family (`import … from`,
//! `require(..)`, `from … import`, `#include`, `use …`) and resolved against
//! the set of indexed paths; specifiers that resolve outside the codebase
//! (external packages, std imports) simply never match.

use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

static IMPORT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // import { x } from './y'; / import x from "y"
        r#"import\s+[^'"]*?\s+from\s+['"]([^'"]+)['"]"#,
        // import './side-effect'
        r#"import\s+['"]([^'"]+)['"]"#,
        // require('./y')
        r#"require\s*\(\s*['"]([^'"]+)['"]\s*\)"#,
        // from a.b import c
        r"(?m)^\s*from\s+([A-Za-z_][\w.]*)\s+import\b",
        // import a.b (python/java style)
        r"(?m)^\s*import\s+([A-Za-z_][\w.]*)\s*$",
        // #include "x.h" / #include <x.h>
        r#"#include\s*[<"]([^>"]+)[>"]"#,
        // use crate::a::b; (rust)
        r"(?m)^\s*(?:pub\s+)?use\s+((?:crate|self|super)::[\w:]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("import pattern compiles"))
    .collect()
});

const RESOLVE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "py", "rs", "go", "java", "c", "h", "cpp", "hpp", "cs",
    "rb", "php", "swift", "kt",
];

/// Extract raw import specifiers from file content.
pub fn extract_specifiers(content: &str) -> Vec<String> {
    let mut specifiers = Vec::new();
    for pattern in IMPORT_PATTERNS.iter() {
        for capture in pattern.captures_iter(content) {
            if let Some(m) = capture.get(1) {
                specifiers.push(m.as_str().to_string());
            }
        }
    }
    specifiers
}

/// Count distinct importers per indexed file.
///
/// `files` maps each relative path to its full content. A file importing the
/// same target several times counts once, matching "how many files import
/// this" semantics. Self-imports are ignored.
pub fn count_imports(files: &BTreeMap<String, String>) -> BTreeMap<String, u64> {
    let known: HashSet<&str> = files.keys().map(|s| s.as_str()).collect();
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();

    for (importer, content) in files {
        let mut targets: HashSet<String> = HashSet::new();
        for specifier in extract_specifiers(content) {
            if let Some(target) = resolve(&specifier, importer, &known) {
                if target != *importer {
                    targets.insert(target);
                }
            }
        }
        for target in targets {
            *counts.entry(target).or_insert(0) += 1;
        }
    }
    counts
}

/// Resolve one specifier against the indexed path set.
fn resolve(specifier: &str, importer: &str, known: &HashSet<&str>) -> Option<String> {
    let importer_dir = match importer.rfind('/') {
        Some(i) => &importer[..i],
        None => "",
    };

    let mut candidates: Vec<String> = Vec::new();
    if specifier.starts_with("./") || specifier.starts_with("../") {
        candidates.push(join_normalized(importer_dir, specifier));
    } else if let Some(rust_path) = specifier.strip_prefix("crate::") {
        let joined = rust_path
            .split("::")
            .collect::<Vec<_>>()
            .join("/");
        candidates.push(format!("src/{joined}"));
        candidates.push(joined);
    } else if specifier.contains('/') {
        // Include-style or root-relative path.
        candidates.push(join_normalized(importer_dir, specifier));
        candidates.push(specifier.to_string());
    } else if specifier.contains('.') && !specifier.contains("::") {
        // Dotted module path (python/java).
        candidates.push(specifier.replace('.', "/"));
    } else {
        // Bare name: sibling file or root-level module.
        candidates.push(join_normalized(importer_dir, specifier));
        candidates.push(specifier.to_string());
    }

    for candidate in candidates {
        if known.contains(candidate.as_str()) {
            return Some(candidate);
        }
        for ext in RESOLVE_EXTENSIONS {
            let with_ext = format!("{candidate}.{ext}");
            if known.contains(with_ext.as_str()) {
                return Some(with_ext);
            }
        }
        for index in ["index.ts", "index.js", "__init__.py", "mod.rs"] {
            let nested = format!("{candidate}/{index}");
            if known.contains(nested.as_str()) {
                return Some(nested);
            }
        }
    }
    None
}

/// Join a relative specifier onto a base directory, folding `.` and `..`.
fn join_normalized(base: &str, relative: &str) -> String {
    let mut parts: Vec<&str> = if base.is_empty() {
        Vec::new()
    } else {
        base.split('/').collect()
    };
    for part in relative.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn extracts_es_module_imports() {
        let specs = extract_specifiers("import { helper } from './utils/common';\n");
        assert_eq!(specs, vec!["./utils/common"]);
    }

    #[test]
    fn extracts_require_and_include() {
        let specs = extract_specifiers(
            "const a = require('./a');\n#include \"lib/util.h\"\n#include <stdio.h>\n",
        );
        assert!(specs.contains(&"./a".to_string()));
        assert!(specs.contains(&"lib/util.h".to_string()));
        assert!(specs.contains(&"stdio.h".to_string()));
    }

    #[test]
    fn extracts_python_and_rust_imports() {
        let specs = extract_specifiers("from pkg.mod import thing\nuse crate::sync::hash;\n");
        assert!(specs.contains(&"pkg.mod".to_string()));
        assert!(specs.contains(&"crate::sync::hash".to_string()));
    }

    #[test]
    fn counts_distinct_importers() {
        let files = files(&[
            ("utils/common.ts", "export const helper = 1;"),
            ("feature1.ts", "import { helper } from './utils/common';"),
            ("feature2.ts", "import { helper } from './utils/common';"),
            (
                "feature3.ts",
                "import { helper } from './utils/common';\nimport more from './utils/common';",
            ),
            ("utils/rare.ts", "export const rare = 1;"),
            ("feature4.ts", "import { rare } from './utils/rare';"),
        ]);
        let counts = count_imports(&files);
        assert_eq!(counts.get("utils/common.ts"), Some(&3));
        assert_eq!(counts.get("utils/rare.ts"), Some(&1));
    }

    #[test]
    fn relative_traversal_resolves() {
        let files = files(&[
            ("src/deep/feature.ts", "import { x } from '../shared';"),
            ("src/shared.ts", "export const x = 1;"),
        ]);
        let counts = count_imports(&files);
        assert_eq!(counts.get("src/shared.ts"), Some(&1));
    }

    #[test]
    fn external_packages_do_not_resolve() {
        let files = files(&[("a.ts", "import fs from 'fs';\nimport x from 'react';")]);
        assert!(count_imports(&files).is_empty());
    }

    #[test]
    fn python_dotted_modules_resolve() {
        let files = files(&[
            ("pkg/mod.py", "VALUE = 1"),
            ("main.py", "from pkg.mod import VALUE"),
        ]);
        let counts = count_imports(&files);
        assert_eq!(counts.get("pkg/mod.py"), Some(&1));
    }

    #[test]
    fn self_imports_are_ignored() {
        let files = files(&[("a.py", "import a")]);
        assert!(count_imports(&files).is_empty());
    }
}
