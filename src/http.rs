use wreq::Client;
use wreq_util::Emulation;

/// Build the HTTP client shared by the geocoder and the schedule source.
pub fn build_client() -> Result<Client, wreq::Error> {
    Client::builder()
        .emulation(Emulation::Chrome143)
        .gzip(true)
        .brotli(true)
        .zstd(true)
        .build()
}
