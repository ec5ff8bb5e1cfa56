use serde::{Deserialize, Serialize};

/// Format-independent long-form document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document title
    pub title: String,
    /// Content blocks in reading order
    pub blocks: Vec<Block>,
}

/// One block of document content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    /// Cover title
    Title { text: String },
    /// Placeholder for a generated table of contents
    TableOfContents,
    PageBreak,
    /// Section heading; level 1 is the top level
    Heading { level: u8, text: String },
    Paragraph {
        text: String,
        #[serde(default, skip_serializing_if = "ParagraphStyle::is_normal")]
        style: ParagraphStyle,
    },
    /// Rows of cells; the first row is the header
    Table { rows: Vec<Vec<String>> },
}

/// Paragraph text style
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParagraphStyle {
    #[default]
    Normal,
    /// Fixed-width text
    Code,
    Quote,
}

impl ParagraphStyle {
    fn is_normal(&self) -> bool {
        *self == ParagraphStyle::Normal
    }
}

impl Document {
    /// Create an empty document with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            blocks: Vec::new(),
        }
    }

    pub fn title(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Title { text: text.into() });
        self
    }

    pub fn table_of_contents(&mut self) -> &mut Self {
        self.blocks.push(Block::TableOfContents);
        self
    }

    pub fn page_break(&mut self) -> &mut Self {
        self.blocks.push(Block::PageBreak);
        self
    }

    pub fn heading(&mut self, level: u8, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Heading {
            level,
            text: text.into(),
        });
        self
    }

    pub fn paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        self.styled(text, ParagraphStyle::Normal)
    }

    pub fn code(&mut self, text: impl Into<String>) -> &mut Self {
        self.styled(text, ParagraphStyle::Code)
    }

    pub fn quote(&mut self, text: impl Into<String>) -> &mut Self {
        self.styled(text, ParagraphStyle::Quote)
    }

    pub fn styled(&mut self, text: impl Into<String>, style: ParagraphStyle) -> &mut Self {
        self.blocks.push(Block::Paragraph {
            text: text.into(),
            style,
        });
        self
    }

    pub fn table(&mut self, rows: Vec<Vec<String>>) -> &mut Self {
        self.blocks.push(Block::Table { rows });
        self
    }

    /// Headings in order, for building a table of contents
    pub fn headings(&self) -> impl Iterator<Item = (u8, &str)> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Heading { level, text } => Some((*level, text.as_str())),
            _ => None,
        })
    }
}
