/* 📖 # What does the api module expose?

The HTTP face of the engine: `ApiService` implements `HttpService` from lectern_base, so the
same service runs behind `RealPal`'s tiny_http server in production and behind
`MockPal::simulate_request` in tests.
*/

mod service;

pub use service::ApiService;
