//! sdcoreConfig.ConfigService messages and client
//!
//! ```proto
//! service ConfigService {
//!   rpc NetworkSliceSubscribe(NetworkSliceRequest) returns (stream NetworkSliceResponse);
//! }
//! ```

use tonic::codec::{ProstCodec, Streaming};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NetworkSliceRequest {
    #[prost(uint32, tag = "1")]
    pub restart_counter: u32,
    #[prost(string, tag = "2")]
    pub client_id: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NetworkSliceResponse {
    #[prost(message, repeated, tag = "1")]
    pub network_slice: ::prost::alloc::vec::Vec<NetworkSlice>,
    #[prost(uint32, tag = "2")]
    pub restart_counter: u32,
    #[prost(uint32, tag = "3")]
    pub config_updated: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NetworkSlice {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub nssai: ::core::option::Option<Nssai>,
    #[prost(message, optional, tag = "4")]
    pub site: ::core::option::Option<SiteInfo>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Nssai {
    #[prost(string, tag = "1")]
    pub sst: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub sd: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SiteInfo {
    #[prost(string, tag = "1")]
    pub site_name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub plmn: ::core::option::Option<PlmnId>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PlmnId {
    #[prost(string, tag = "1")]
    pub mcc: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub mnc: ::prost::alloc::string::String,
}

const NETWORK_SLICE_SUBSCRIBE: &str = "/sdcoreConfig.ConfigService/NetworkSliceSubscribe";

/// Client for `sdcoreConfig.ConfigService`
#[derive(Debug, Clone)]
pub struct ConfigServiceClient {
    inner: tonic::client::Grpc<Channel>,
}

impl ConfigServiceClient {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    /// Wait until the channel can accept a request
    pub async fn ready(&mut self) -> Result<(), tonic::transport::Error> {
        self.inner.ready().await
    }

    pub async fn network_slice_subscribe(
        &mut self,
        request: NetworkSliceRequest,
    ) -> Result<tonic::Response<Streaming<NetworkSliceResponse>>, tonic::Status> {
        self.inner.ready().await.map_err(|e| {
            tonic::Status::unavailable(format!("Service was not ready: {e}"))
        })?;
        let codec: ProstCodec<NetworkSliceRequest, NetworkSliceResponse> = ProstCodec::default();
        let path = PathAndQuery::from_static(NETWORK_SLICE_SUBSCRIBE);
        self.inner
            .server_streaming(tonic::Request::new(request), path, codec)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_response_decode() {
        let response = NetworkSliceResponse {
            network_slice: vec![NetworkSlice {
                name: "slice1".into(),
                nssai: Some(Nssai {
                    sst: "1".into(),
                    sd: "010203".into(),
                }),
                site: Some(SiteInfo {
                    site_name: "site1".into(),
                    plmn: Some(PlmnId {
                        mcc: "208".into(),
                        mnc: "93".into(),
                    }),
                }),
            }],
            restart_counter: 7,
            config_updated: 1,
        };

        let bytes = response.encode_to_vec();
        let decoded = NetworkSliceResponse::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_request_defaults() {
        let decoded = NetworkSliceRequest::decode(&[][..]).unwrap();
        assert_eq!(decoded.restart_counter, 0);
        assert!(decoded.client_id.is_empty());
    }
}
