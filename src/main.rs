fn main() -> std::process::ExitCode {
    pdfsift::run()
}
