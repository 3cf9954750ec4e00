use crate::error::ChunkerError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Kind of document being chunked; selects the default separator table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    /// Plain prose (blank line, newline, space)
    #[default]
    Prose,
    Markdown,
    Html,
    Latex,
    Rst,
    Cpp,
    Go,
    Java,
    JavaScript,
    TypeScript,
    Php,
    Proto,
    Python,
    Ruby,
    Rust,
    Scala,
    Swift,
    Solidity,
}

const PROSE: &[&str] = &["\n\n", "\n", " "];

const MARKDOWN: &[&str] = &[
    "\n## ",
    "\n### ",
    "\n#### ",
    "\n##### ",
    "\n###### ",
    "```\n\n",
    "\n\n***\n\n",
    "\n\n---\n\n",
    "\n\n___\n\n",
    "<table>",
    "\n\n",
    "\n",
    " ",
];

const HTML: &[&str] = &[
    "<body>", "<div>", "<p>", "<br>", "<li>", "<h1>", "<h2>", "<h3>", "<h4>", "<h5>", "<h6>",
    "<span>", "<table>", "<tr>", "<td>", "<th>", "<ul>", "<ol>", "<header>", "<footer>", "<nav>",
    "<head>", "<style>", "<script>", "<meta>", "<title>", " ",
];

const LATEX: &[&str] = &[
    "\n\\chapter{",
    "\n\\section{",
    "\n\\subsection{",
    "\n\\subsubsection{",
    "\n\\begin{enumerate}",
    "\n\\begin{itemize}",
    "\n\\begin{description}",
    "\n\\begin{list}",
    "\n\\begin{quote}",
    "\n\\begin{quotation}",
    "\n\\begin{verse}",
    "\n\\begin{verbatim}",
    "\n\\begin{align}",
    "$$",
    "$",
    "\n\n",
    "\n",
    " ",
];

const RST: &[&str] = &["\n===\n", "\n---\n", "\n***\n", "\n.. ", "\n\n", "\n", " "];

const CPP: &[&str] = &[
    "\nclass ", "\nvoid ", "\nint ", "\nfloat ", "\ndouble ", "\nif ", "\nfor ", "\nwhile ",
    "\nswitch ", "\ncase ", "\n\n", "\n", " ",
];

const GO: &[&str] = &[
    "\nfunc ", "\nvar ", "\nconst ", "\ntype ", "\nif ", "\nfor ", "\nswitch ", "\ncase ", "\n\n",
    "\n", " ",
];

const JAVA: &[&str] = &[
    "\nclass ",
    "\npublic ",
    "\nprotected ",
    "\nprivate ",
    "\nstatic ",
    "\nif ",
    "\nfor ",
    "\nwhile ",
    "\nswitch ",
    "\ncase ",
    "\n\n",
    "\n",
    " ",
];

const JAVASCRIPT: &[&str] = &[
    "\nfunction ",
    "\nconst ",
    "\nlet ",
    "\nvar ",
    "\nclass ",
    "\nif ",
    "\nfor ",
    "\nwhile ",
    "\nswitch ",
    "\ncase ",
    "\ndefault ",
    "\n\n",
    "\n",
    " ",
];

const PHP: &[&str] = &[
    "\nfunction ",
    "\nclass ",
    "\nif ",
    "\nforeach ",
    "\nwhile ",
    "\ndo ",
    "\nswitch ",
    "\ncase ",
    "\n\n",
    "\n",
    " ",
];

const PROTO: &[&str] = &[
    "\nmessage ",
    "\nservice ",
    "\nenum ",
    "\noption ",
    "\nimport ",
    "\nsyntax ",
    "\n\n",
    "\n",
    " ",
];

const PYTHON: &[&str] = &["\nclass ", "\ndef ", "\n\tdef ", "\n\n", "\n", " "];

const RUBY: &[&str] = &[
    "\ndef ", "\nclass ", "\nif ", "\nunless ", "\nwhile ", "\nfor ", "\ndo ", "\nbegin ",
    "\nrescue ", "\n\n", "\n", " ",
];

const RUST: &[&str] = &[
    "\nfn ", "\nconst ", "\nlet ", "\nif ", "\nwhile ", "\nfor ", "\nloop ", "\nmatch ",
    "\nconst ", "\n\n", "\n", " ",
];

const SCALA: &[&str] = &[
    "\nclass ", "\nobject ", "\ndef ", "\nval ", "\nvar ", "\nif ", "\nfor ", "\nwhile ",
    "\nmatch ", "\ncase ", "\n\n", "\n", " ",
];

const SWIFT: &[&str] = &[
    "\nfunc ", "\nclass ", "\nstruct ", "\nenum ", "\nif ", "\nfor ", "\nwhile ", "\ndo ",
    "\nswitch ", "\ncase ", "\n\n", "\n", " ",
];

const SOLIDITY: &[&str] = &[
    "\npragma ",
    "\nusing ",
    "\ncontract ",
    "\ninterface ",
    "\nlibrary ",
    "\nconstructor ",
    "\ntype ",
    "\nfunction ",
    "\nevent ",
    "\nmodifier ",
    "\nerror ",
    "\nstruct ",
    "\nenum ",
    "\nif ",
    "\nfor ",
    "\nwhile ",
    "\ndo while ",
    "\nassembly ",
    "\n\n",
    "\n",
    " ",
];

impl DocType {
    /// Detect document type from a file extension. Unknown extensions are prose.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "md" | "markdown" => DocType::Markdown,
            "html" | "htm" | "xhtml" => DocType::Html,
            "tex" | "latex" => DocType::Latex,
            "rst" => DocType::Rst,
            "c" | "h" | "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => DocType::Cpp,
            "go" => DocType::Go,
            "java" => DocType::Java,
            "js" | "mjs" | "cjs" | "jsx" => DocType::JavaScript,
            "ts" | "tsx" | "mts" | "cts" => DocType::TypeScript,
            "php" => DocType::Php,
            "proto" => DocType::Proto,
            "py" | "pyw" => DocType::Python,
            "rb" => DocType::Ruby,
            "rs" => DocType::Rust,
            "scala" | "sc" => DocType::Scala,
            "swift" => DocType::Swift,
            "sol" => DocType::Solidity,
            _ => DocType::Prose,
        }
    }

    /// Detect document type from a path or URI (by its extension)
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or_default()
    }

    /// Get document type name as string
    pub fn as_str(self) -> &'static str {
        match self {
            DocType::Prose => "prose",
            DocType::Markdown => "markdown",
            DocType::Html => "html",
            DocType::Latex => "latex",
            DocType::Rst => "rst",
            DocType::Cpp => "cpp",
            DocType::Go => "go",
            DocType::Java => "java",
            DocType::JavaScript => "javascript",
            DocType::TypeScript => "typescript",
            DocType::Php => "php",
            DocType::Proto => "proto",
            DocType::Python => "python",
            DocType::Ruby => "ruby",
            DocType::Rust => "rust",
            DocType::Scala => "scala",
            DocType::Swift => "swift",
            DocType::Solidity => "solidity",
        }
    }

    /// Priority-ordered boundary markers, most structurally significant first.
    pub fn default_separators(self) -> &'static [&'static str] {
        match self {
            DocType::Prose => PROSE,
            DocType::Markdown => MARKDOWN,
            DocType::Html => HTML,
            DocType::Latex => LATEX,
            DocType::Rst => RST,
            DocType::Cpp => CPP,
            DocType::Go => GO,
            DocType::Java => JAVA,
            DocType::JavaScript | DocType::TypeScript => JAVASCRIPT,
            DocType::Php => PHP,
            DocType::Proto => PROTO,
            DocType::Python => PYTHON,
            DocType::Ruby => RUBY,
            DocType::Rust => RUST,
            DocType::Scala => SCALA,
            DocType::Swift => SWIFT,
            DocType::Solidity => SOLIDITY,
        }
    }
}

impl FromStr for DocType {
    type Err = ChunkerError;

    /// Accepts canonical names (`"markdown"`) as well as extensions (`"md"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().trim_start_matches('.').to_lowercase();
        if lowered == "prose" || lowered == "text" || lowered == "txt" {
            return Ok(DocType::Prose);
        }
        let by_name = ALL.iter().copied().find(|t| t.as_str() == lowered);
        if let Some(doc_type) = by_name {
            return Ok(doc_type);
        }
        match Self::from_extension(&lowered) {
            DocType::Prose => Err(ChunkerError::UnknownDocType(s.to_string())),
            other => Ok(other),
        }
    }
}

impl std::fmt::Display for DocType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const ALL: &[DocType] = &[
    DocType::Prose,
    DocType::Markdown,
    DocType::Html,
    DocType::Latex,
    DocType::Rst,
    DocType::Cpp,
    DocType::Go,
    DocType::Java,
    DocType::JavaScript,
    DocType::TypeScript,
    DocType::Php,
    DocType::Proto,
    DocType::Python,
    DocType::Ruby,
    DocType::Rust,
    DocType::Scala,
    DocType::Swift,
    DocType::Solidity,
];
