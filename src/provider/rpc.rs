//! Declares the client side of a provider gRPC service.
//!
//! `provider_service!` expands to a `ProviderClient` over a tonic channel and a
//! `ProviderRpc` trait the adapters call through. The trait's default methods
//! answer `Unimplemented`, so stub plugins only implement what they serve.

macro_rules! provider_service {
    (
        package = $package:literal;
        $( rpc $method:ident($rpc:literal, $req:ty) -> $resp:ty; )*
    ) => {
        /// gRPC client for one plugin connection.
        #[derive(Debug, Clone)]
        pub struct ProviderClient {
            inner: tonic::client::Grpc<tonic::transport::Channel>,
        }

        impl ProviderClient {
            pub fn new(channel: tonic::transport::Channel) -> Self {
                Self {
                    inner: tonic::client::Grpc::new(channel),
                }
            }

            pub fn max_decoding_message_size(mut self, limit: usize) -> Self {
                self.inner = self.inner.max_decoding_message_size(limit);
                self
            }

            pub fn max_encoding_message_size(mut self, limit: usize) -> Self {
                self.inner = self.inner.max_encoding_message_size(limit);
                self
            }

            async fn unary<Req, Resp>(
                &self,
                path: &'static str,
                request: Req,
            ) -> Result<Resp, tonic::Status>
            where
                Req: prost::Message + Send + Sync + 'static,
                Resp: prost::Message + Default + Send + Sync + 'static,
            {
                // Clone is cheap: it shares the underlying HTTP/2 channel.
                let mut grpc = self.inner.clone();
                grpc.ready().await.map_err(|e| {
                    tonic::Status::unknown(format!("plugin service was not ready: {e}"))
                })?;
                let codec = tonic::codec::ProstCodec::<Req, Resp>::default();
                let path = tonic::codegen::http::uri::PathAndQuery::from_static(path);
                grpc.unary(tonic::Request::new(request), path, codec)
                    .await
                    .map(tonic::Response::into_inner)
            }
        }

        /// The RPCs of the provider service.
        #[async_trait::async_trait]
        pub trait ProviderRpc: Send + Sync {
            $(
                async fn $method(&self, request: $req) -> Result<$resp, tonic::Status> {
                    let _ = request;
                    Err(tonic::Status::unimplemented(concat!(
                        $package, ".Provider/", $rpc, " is not implemented"
                    )))
                }
            )*
        }

        #[async_trait::async_trait]
        impl ProviderRpc for ProviderClient {
            $(
                async fn $method(&self, request: $req) -> Result<$resp, tonic::Status> {
                    self.unary(concat!("/", $package, ".Provider/", $rpc), request)
                        .await
                }
            )*
        }
    };
}
