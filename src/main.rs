fn main() -> anyhow::Result<()> {
    tagtext::run()
}
