#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let text = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    read_aloud::run(text).await
}
