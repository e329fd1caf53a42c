//! Best-effort static import/export extraction.
//!
//! Each supported language owns its regex rule set; dispatch is a closed
//! match on `Language` so an unsupported language yields the empty analysis
//! instead of falling through. Extraction never errors on malformed source:
//! no matches means empty lists.

use crate::language::Language;
use regex::Regex;

/// Module specifiers referenced and symbol names declared by one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    pub imports: Vec<String>,
    pub exports: Vec<String>,
}

/// Run the language's extraction rules over file content.
pub fn analyze(language: Language, content: &str) -> Analysis {
    match language {
        Language::TypeScript | Language::JavaScript => analyze_ecmascript(content),
        Language::Python => analyze_python(content),
        Language::Rust => analyze_rust(content),
        Language::Go => analyze_go(content),
        _ => Analysis::default(),
    }
}

fn analyze_ecmascript(content: &str) -> Analysis {
    let import_rules = [
        // import x from 'spec'; import 'spec'; export ... from 'spec'
        r#"(?m)^\s*import\s+(?:[\w$*{},\s]+\s+from\s+)?['"]([^'"]+)['"]"#,
        r#"(?m)^\s*export\s+[\w$*{},\s]+\s+from\s+['"]([^'"]+)['"]"#,
        r#"require\(\s*['"]([^'"]+)['"]\s*\)"#,
        r#"import\(\s*['"]([^'"]+)['"]\s*\)"#,
    ];
    let export_rules = [
        r"(?m)^\s*export\s+(?:default\s+)?(?:async\s+)?(?:function|class)\s+([A-Za-z_$][\w$]*)",
        r"(?m)^\s*export\s+(?:const|let|var)\s+([A-Za-z_$][\w$]*)",
        r"(?m)^\s*export\s+(?:interface|type|enum)\s+([A-Za-z_$][\w$]*)",
        r"(?m)^\s*module\.exports\.([A-Za-z_$][\w$]*)\s*=",
    ];
    extract(content, &import_rules, &export_rules)
}

fn analyze_python(content: &str) -> Analysis {
    let import_rules = [
        r"(?m)^\s*import\s+([\w.]+)",
        r"(?m)^\s*from\s+([\w.]+)\s+import",
    ];
    // Top-level declarations only; indented defs are methods.
    let export_rules = [r"(?m)^def\s+(\w+)", r"(?m)^class\s+(\w+)"];
    extract(content, &import_rules, &export_rules)
}

fn analyze_rust(content: &str) -> Analysis {
    let import_rules = [r"(?m)^\s*use\s+([\w:]+)", r"(?m)^\s*mod\s+(\w+)\s*;"];
    let export_rules =
        [r"(?m)^\s*pub\s+(?:async\s+)?(?:fn|struct|enum|trait|const|static|type|mod)\s+(\w+)"];
    extract(content, &import_rules, &export_rules)
}

fn analyze_go(content: &str) -> Analysis {
    let mut analysis = extract(
        content,
        &[r#"(?m)^\s*import\s+(?:\w+\s+)?"([^"]+)""#],
        &[r"(?m)^func\s+([A-Z]\w*)", r"(?m)^type\s+([A-Z]\w*)"],
    );
    // Grouped import blocks: import ( "a" \n "b" )
    if let Some(block) = Regex::new(r"(?s)import\s*\(([^)]*)\)")
        .ok()
        .and_then(|re| re.captures(content))
    {
        if let Ok(line_re) = Regex::new(r#""([^"]+)""#) {
            for capture in line_re.captures_iter(&block[1]) {
                push_unique(&mut analysis.imports, capture[1].to_string());
            }
        }
    }
    analysis
}

fn extract(content: &str, import_rules: &[&str], export_rules: &[&str]) -> Analysis {
    let mut analysis = Analysis::default();
    for rule in import_rules {
        apply_rule(content, rule, &mut analysis.imports);
    }
    for rule in export_rules {
        apply_rule(content, rule, &mut analysis.exports);
    }
    analysis
}

fn apply_rule(content: &str, rule: &str, into: &mut Vec<String>) {
    // Rules are static and known-good; a bad one is a bug we surface in
    // tests, not at runtime.
    let Ok(re) = Regex::new(rule) else {
        return;
    };
    for capture in re.captures_iter(content) {
        if let Some(matched) = capture.get(1) {
            push_unique(into, matched.as_str().to_string());
        }
    }
}

fn push_unique(list: &mut Vec<String>, value: String) {
    if !list.contains(&value) {
        list.push(value);
    }
}
