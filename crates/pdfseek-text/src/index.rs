use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, Occur, PhraseQuery, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::tokenizer::{Token, TokenStream};
use tantivy::{doc, Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use pdfseek_core::traits::TermIndex;
use pdfseek_core::types::{Chunk, ChunkHit};

use crate::tantivy_utils::{build_schema, register_tokenizer, TOKENIZER_NAME};

const WRITER_MEMORY_BUDGET: usize = 50_000_000;

/// BM25 term index over chunk text. Writes go through a single writer
/// and become visible to searches after each commit.
pub struct TantivyIndexer {
	index: Index,
	reader: IndexReader,
	writer: Mutex<IndexWriter>,
	id_field: Field,
	source_field: Field,
	text_field: Field,
}

impl TantivyIndexer {
	/// Recreate an on-disk index at `index_dir`.
	pub fn new(index_dir: PathBuf) -> Result<Self> {
		if index_dir.exists() { std::fs::remove_dir_all(&index_dir)?; }
		std::fs::create_dir_all(&index_dir)?;
		let index = Index::create_in_dir(&index_dir, build_schema())
			.with_context(|| format!("failed to create index in {}", index_dir.display()))?;
		Self::from_index(index)
	}

	pub fn in_memory() -> Result<Self> {
		Self::from_index(Index::create_in_ram(build_schema()))
	}

	fn from_index(index: Index) -> Result<Self> {
		register_tokenizer(&index);
		let schema = index.schema();
		let id_field = schema.get_field("id")?;
		let source_field = schema.get_field("source")?;
		let text_field = schema.get_field("text")?;
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		let writer = index.writer(WRITER_MEMORY_BUDGET)?;
		Ok(Self { index, reader, writer: Mutex::new(writer), id_field, source_field, text_field })
	}

	/// Number of searchable chunks.
	pub fn num_docs(&self) -> u64 {
		self.reader.searcher().num_docs()
	}

	/// Run `text` through the same analyzer the `text` field is indexed with.
	fn analyze(&self, text: &str) -> Result<Vec<(usize, String)>> {
		let mut analyzer = self.index.tokenizers().get(TOKENIZER_NAME)
			.with_context(|| format!("tokenizer '{TOKENIZER_NAME}' is not registered"))?;
		let mut tokens = Vec::new();
		let mut stream = analyzer.token_stream(text);
		stream.process(&mut |t: &Token| tokens.push((t.position, t.text.clone())));
		Ok(tokens)
	}

	/// Bag-of-words query on the text field: one optional term clause per
	/// distinct analyzed token, plus a phrase clause per balanced quoted span
	/// so exact phrases rank higher. Query syntax is never interpreted.
	fn build_query(&self, query: &str) -> Result<Option<BooleanQuery>> {
		let mut seen = HashSet::new();
		let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
		for (_, text) in self.analyze(query)? {
			if seen.insert(text.clone()) {
				let term = Term::from_field_text(self.text_field, &text);
				clauses.push((Occur::Should, Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs))));
			}
		}
		if clauses.is_empty() { return Ok(None); }
		for span in quoted_spans(query) {
			let tokens = self.analyze(span)?;
			let Some(&(base, _)) = tokens.first() else { continue };
			if tokens.len() < 2 { continue; }
			let terms = tokens.into_iter()
				.map(|(pos, text)| (pos - base, Term::from_field_text(self.text_field, &text)))
				.collect();
			clauses.push((Occur::Should, Box::new(PhraseQuery::new_with_offset(terms))));
		}
		Ok(Some(BooleanQuery::new(clauses)))
	}

	fn commit(&self, writer: &mut IndexWriter) -> Result<()> {
		writer.commit()?;
		self.reader.reload()?;
		Ok(())
	}
}

impl TermIndex for TantivyIndexer {
	fn index(&self, chunks: &[Chunk]) -> Result<()> {
		let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
		for c in chunks {
			// replace any earlier copy of this chunk
			writer.delete_term(Term::from_field_text(self.id_field, &c.id));
			writer.add_document(doc!(
				self.id_field => c.id.clone(),
				self.source_field => c.source.clone(),
				self.text_field => c.content.clone(),
			))?;
		}
		self.commit(&mut writer)
	}

	fn term_score(&self, query: &str, k: usize) -> Result<Vec<ChunkHit>> {
		if k == 0 { return Ok(Vec::new()); }
		let Some(q) = self.build_query(query)? else {
			debug!(query, "query has no searchable terms");
			return Ok(Vec::new());
		};
		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&q, &TopDocs::with_limit(k))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			let Some(id) = doc.get_first(self.id_field).and_then(|v| v.as_str()) else {
				debug!(?addr, "skipping stored document without id");
				continue;
			};
			hits.push(ChunkHit { id: id.to_string(), score: score.max(0.0) });
		}
		Ok(hits)
	}

	fn remove_source(&self, source: &str) -> Result<usize> {
		let term = Term::from_field_text(self.source_field, source);
		let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
		let removed = self.reader.searcher().search(&TermQuery::new(term.clone(), IndexRecordOption::Basic), &Count)?;
		if removed > 0 {
			writer.delete_term(term);
			self.commit(&mut writer)?;
		}
		Ok(removed)
	}

	fn clear(&self) -> Result<()> {
		let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
		writer.delete_all_documents()?;
		self.commit(&mut writer)
	}
}

/// Text between balanced pairs of double quotes.
fn quoted_spans(query: &str) -> Vec<&str> {
	let parts: Vec<&str> = query.split('"').collect();
	parts.iter().enumerate()
		.filter(|(i, span)| i % 2 == 1 && *i + 1 < parts.len() && !span.trim().is_empty())
		.map(|(_, span)| *span)
		.collect()
}
