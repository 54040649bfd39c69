use pdfseek_core::traits::{Embedder, VectorIndex};
use pdfseek_core::types::Chunk;
use pdfseek_embed::HashingEmbedder;
use pdfseek_vector::MemoryVectorIndex;

fn chunk(id: &str, source: &str, page: u32, content: &str) -> Chunk {
    Chunk { id: id.into(), content: content.into(), source: source.into(), page, chunk_index: 0 }
}

#[test]
fn memory_index_full_flow() {
    let embedder = HashingEmbedder::new(1024).expect("embedder");
    let chunks = vec![
        chunk("a-1", "annual.pdf", 1, "Total revenue for fiscal year grew strongly"),
        chunk("a-2", "annual.pdf", 2, "Employee headcount and office locations"),
        chunk("g-1", "garden.pdf", 1, "Planting tomatoes in raised beds"),
    ];
    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    let embeddings = embedder.embed_batch(&texts).expect("embed");

    let index = MemoryVectorIndex::new();
    index.index(&chunks, &embeddings).expect("index");

    let q = embedder.embed("revenue fiscal year").expect("embed query");
    let hits = index.nearest(&q, 3).expect("nearest");
    eprintln!("memory: 'revenue fiscal year' -> {hits:?}");
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].id, "a-1");
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));

    assert_eq!(index.remove_source("annual.pdf").expect("remove"), 2);
    let hits = index.nearest(&q, 3).expect("nearest after removal");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "g-1");
}
