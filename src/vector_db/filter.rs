use crate::types::CodeChunk;

/// Filterable chunk columns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    RepoUrl,
    FilePath,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::RepoUrl => "repo_url",
            Column::FilePath => "file_path",
        }
    }

    fn value_of(self, chunk: &CodeChunk) -> &str {
        match self {
            Column::RepoUrl => &chunk.repo_url,
            Column::FilePath => &chunk.file_path,
        }
    }
}

/// Row predicate built from values, never from concatenated SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq(Column, String),
    NotEq(Column, String),
    And(Box<Filter>, Box<Filter>),
}

impl Filter {
    pub fn eq(column: Column, value: impl Into<String>) -> Self {
        Filter::Eq(column, value.into())
    }

    pub fn ne(column: Column, value: impl Into<String>) -> Self {
        Filter::NotEq(column, value.into())
    }

    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }

    /// Rows belonging to one file of one repository
    pub fn for_file(repo_url: &str, file_path: &str) -> Self {
        Filter::eq(Column::RepoUrl, repo_url).and(Filter::eq(Column::FilePath, file_path))
    }

    /// SQL predicate for LanceDB (`only_if`, `delete`, `count_rows`)
    pub fn to_sql(&self) -> String {
        match self {
            Filter::Eq(column, value) => format!("{} = {}", column.name(), quote(value)),
            Filter::NotEq(column, value) => format!("{} != {}", column.name(), quote(value)),
            Filter::And(left, right) => format!("({}) AND ({})", left.to_sql(), right.to_sql()),
        }
    }

    /// Evaluate directly against a chunk
    pub fn matches(&self, chunk: &CodeChunk) -> bool {
        match self {
            Filter::Eq(column, value) => column.value_of(chunk) == value,
            Filter::NotEq(column, value) => column.value_of(chunk) != value,
            Filter::And(left, right) => left.matches(chunk) && right.matches(chunk),
        }
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
