fn main() -> anyhow::Result<()> {
    greyscript_transpiler::run()
}
