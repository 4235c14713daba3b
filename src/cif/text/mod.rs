//! Text CIF (mmCIF / CIF 1.1) reader.
//!
//! Follows the CIF 1.1 grammar with a few practical differences:
//!
//! - Only the `data_`, `save_` and `loop_` keywords are case-insensitive.
//! - Bare `.` and `?` are treated the same as quoted `'.'` and `'?'`.
//! - Backslash line continuations and text escapes inside values are kept
//!   verbatim; post-processing them is left to the consumer.
//!
//! Values are never copied: every field keeps token ranges into the input and
//! converts on access. Loops are read in chunks so that a host can observe
//! progress and cancel between chunks.

mod lexer;

use log::debug;

use crate::data::TextField;
use crate::result::{Parsed, ReaderError, ReaderResult};
use crate::task::{chunked_subtask, ParseOptions, Progress, RuntimeContext};
use crate::text::Tokens;

use super::{CategoryMap, CifBlock, CifCategory, CifField, CifFile, CifSaveFrame};
use lexer::{CifLexer, CifTokenType};

/// Loop values read between two progress checkpoints
pub const DEFAULT_LOOP_CHUNK_SIZE: usize = 1_000_000;

/// Parse a text CIF document with a default runtime context
pub fn parse_cif_text(data: &str) -> ReaderResult<CifFile<'_>> {
    parse_cif_text_with(data, &mut RuntimeContext::new(), &ParseOptions::default())
}

/// Parse a text CIF document, reporting progress to `ctx` between loop chunks
pub fn parse_cif_text_with<'a>(
    data: &'a str,
    ctx: &mut RuntimeContext,
    options: &ParseOptions,
) -> ReaderResult<CifFile<'a>> {
    debug!("Parsing CIF text ({} bytes)", data.len());
    let mut parser = CifTextParser {
        lexer: CifLexer::new(data),
        chunk_size: options.chunk_size_or(DEFAULT_LOOP_CHUNK_SIZE),
    };
    ctx.update(Progress::parsing(0, data.len()))?;
    let file = parser.parse(ctx)?;
    debug!(
        "Parsed {} data block(s), {} categories",
        file.blocks.len(),
        file.blocks.iter().map(|b| b.categories.len()).sum::<usize>()
    );
    Ok(Parsed::new(file))
}

struct CifTextParser<'a> {
    lexer: CifLexer<'a>,
    chunk_size: usize,
}

struct LoopState<'l, 'a> {
    lexer: &'l mut CifLexer<'a>,
    tokens: Vec<Tokens<'a>>,
    token_count: usize,
}

fn read_loop_chunk(chunk_size: usize, state: &mut LoopState<'_, '_>) -> usize {
    let field_count = state.tokens.len();
    let mut counter = 0;
    while state.lexer.token_type == CifTokenType::Value && counter < chunk_size {
        let (start, end) = (state.lexer.t.token_start, state.lexer.t.token_end);
        state.tokens[state.token_count % field_count].add(start, end);
        state.token_count += 1;
        state.lexer.move_next();
        counter += 1;
    }
    counter
}

impl<'a> CifTextParser<'a> {
    fn data(&self) -> &'a str {
        self.lexer.t.data()
    }

    /// A run of `_cat.field value` pairs sharing one category
    fn handle_single(&mut self, frame: &mut CategoryMap<'a>) -> Result<(), ReaderError> {
        let ns_start = self.lexer.t.token_start;
        let ns_end = self.lexer.namespace_end();
        let name = &self.data()[ns_start..ns_end];
        let mut fields = Vec::new();

        while self.lexer.token_type == CifTokenType::ColumnName
            && self.lexer.is_namespace(ns_start, ns_end)
        {
            let field_name = self.lexer.token_str().get(name.len() + 1..).unwrap_or("");
            self.lexer.move_next();
            if self.lexer.token_type != CifTokenType::Value {
                return Err(ReaderError::syntax("Expected value.", self.lexer.t.line_number));
            }
            let mut tokens = Tokens::new(self.data(), 2);
            tokens.add(self.lexer.t.token_start, self.lexer.t.token_end);
            fields.push((field_name.to_string(), CifField::Text(TextField::new(tokens))));
            self.lexer.move_next();
        }

        frame.insert(CifCategory::new(&name[1..], 1, fields));
        Ok(())
    }

    fn handle_loop(
        &mut self,
        frame: &mut CategoryMap<'a>,
        ctx: &mut RuntimeContext,
    ) -> Result<(), ReaderError> {
        let loop_line = self.lexer.t.line_number;
        self.lexer.move_next();

        let data = self.data();
        let name = &data[self.lexer.t.token_start..self.lexer.namespace_end()];
        let is_flat = self.lexer.is_flat_namespace();
        let mut field_names = Vec::new();
        while self.lexer.token_type == CifTokenType::ColumnName {
            let token = self.lexer.token_str();
            field_names.push(if is_flat {
                token
            } else {
                token.get(name.len() + 1..).unwrap_or("")
            });
            self.lexer.move_next();
        }

        let not_a_multiple = |line: usize| {
            ReaderError::syntax(
                format!(
                    "The number of values for loop starting at line {loop_line} is not a multiple of the number of columns."
                ),
                line,
            )
        };
        if field_names.is_empty() {
            return Err(not_a_multiple(self.lexer.t.line_number));
        }

        let row_estimate = if name == "_atom_site" {
            data.len() / 100
        } else {
            32
        };
        let mut state = LoopState {
            lexer: &mut self.lexer,
            tokens: (0..field_names.len())
                .map(|_| Tokens::new(data, 2 * row_estimate))
                .collect(),
            token_count: 0,
        };
        chunked_subtask(ctx, self.chunk_size, &mut state, read_loop_chunk, |ctx, state| {
            ctx.update(Progress::parsing(state.lexer.t.position, data.len()))
        })?;

        let field_count = field_names.len();
        let LoopState {
            tokens, token_count, ..
        } = state;
        if token_count % field_count != 0 {
            return Err(not_a_multiple(self.lexer.t.line_number));
        }
        let row_count = token_count / field_count;

        if is_flat {
            for (field_name, tokens) in field_names.iter().zip(tokens) {
                let field = CifField::Text(TextField::new(tokens));
                frame.insert(CifCategory::new(
                    &field_name[1..],
                    row_count,
                    vec![(String::new(), field)],
                ));
            }
        } else {
            let fields = field_names
                .iter()
                .zip(tokens)
                .map(|(n, t)| (n.to_string(), CifField::Text(TextField::new(t))))
                .collect();
            frame.insert(CifCategory::new(&name[1..], row_count, fields));
        }
        Ok(())
    }

    fn parse(&mut self, ctx: &mut RuntimeContext) -> Result<CifFile<'a>, ReaderError> {
        let data = self.data();
        let mut blocks = Vec::new();

        let mut block_header = String::new();
        let mut block_ctx = CategoryMap::new();
        let mut save_frames = Vec::new();

        let mut save_ctx = CategoryMap::new();
        let mut save_header = String::new();

        self.lexer.move_next();
        while self.lexer.token_type != CifTokenType::End {
            match self.lexer.token_type {
                CifTokenType::Data => {
                    if self.lexer.in_save_frame {
                        return Err(ReaderError::syntax(
                            "Unexpected data block inside a save frame.",
                            self.lexer.t.line_number,
                        ));
                    }
                    if !block_ctx.is_empty() || !save_frames.is_empty() {
                        blocks.push(CifBlock::new(
                            std::mem::take(&mut block_header),
                            std::mem::take(&mut block_ctx),
                            std::mem::take(&mut save_frames),
                        ));
                    }
                    block_header = self.lexer.token_str()[5..].to_string();
                    block_ctx = CategoryMap::new();
                    save_frames = Vec::new();
                    self.lexer.move_next();
                }
                CifTokenType::Save => {
                    if self.lexer.token_len() == 5 {
                        // `save_` closes the current frame
                        if !save_ctx.is_empty() {
                            save_frames.push(CifSaveFrame {
                                header: std::mem::take(&mut save_header),
                                categories: std::mem::take(&mut save_ctx),
                            });
                        }
                        self.lexer.in_save_frame = false;
                    } else {
                        if self.lexer.in_save_frame {
                            return Err(ReaderError::syntax(
                                "Save frames cannot be nested.",
                                self.lexer.t.line_number,
                            ));
                        }
                        self.lexer.in_save_frame = true;
                        save_header = data[self.lexer.t.token_start + 5..self.lexer.t.token_end].to_string();
                        save_ctx = CategoryMap::new();
                    }
                    self.lexer.move_next();
                }
                CifTokenType::Loop => {
                    let frame = if self.lexer.in_save_frame {
                        &mut save_ctx
                    } else {
                        &mut block_ctx
                    };
                    self.handle_loop(frame, ctx)?;
                }
                CifTokenType::ColumnName => {
                    let frame = if self.lexer.in_save_frame {
                        &mut save_ctx
                    } else {
                        &mut block_ctx
                    };
                    self.handle_single(frame)?;
                }
                _ => {
                    return Err(ReaderError::syntax(
                        "Unexpected token. Expected data_, loop_, or data name.",
                        self.lexer.t.line_number,
                    ));
                }
            }
        }

        if self.lexer.in_save_frame {
            return Err(ReaderError::syntax(
                format!("Unfinished save frame ({save_header})."),
                self.lexer.t.line_number,
            ));
        }
        if !block_ctx.is_empty() || !save_frames.is_empty() {
            blocks.push(CifBlock::new(block_header, block_ctx, save_frames));
        }
        Ok(CifFile::new(blocks))
    }
}
